use depot_core::db::{open_db, open_db_in_memory, Executor};
use depot_core::model::geography::CountryId;
use depot_core::{
    Country, ErrorKind, GeographyRepository, GeographyService, Locality, NewLocality, Province,
    RepoError, RepoResult, RequestGeography, ResponseGeography, SqliteGeographyRepository,
};
use rusqlite::{Connection, Transaction};
use std::thread;

fn new_locality(id: &str, country: &str, province: &str, locality: &str) -> NewLocality {
    NewLocality {
        locality_id: id.to_string(),
        country_name: country.to_string(),
        province_name: province.to_string(),
        locality_name: locality.to_string(),
    }
}

fn repo(conn: &Connection) -> SqliteGeographyRepository<'_> {
    SqliteGeographyRepository::try_new(conn).expect("migrated db should be accepted")
}

fn service(conn: &Connection) -> GeographyService<SqliteGeographyRepository<'_>> {
    GeographyService::new(repo(conn))
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .expect("count query should succeed")
}

/// Never sees existing provinces, so every resolution attempts an insert.
struct BlindProvinceLookup<'conn> {
    inner: SqliteGeographyRepository<'conn>,
}

impl GeographyRepository for BlindProvinceLookup<'_> {
    fn begin_tx(&self) -> RepoResult<Transaction<'_>> {
        self.inner.begin_tx()
    }

    fn commit_tx(&self, tx: Transaction<'_>) -> RepoResult<()> {
        self.inner.commit_tx(tx)
    }

    fn rollback_tx(&self, tx: Transaction<'_>) -> RepoResult<()> {
        self.inner.rollback_tx(tx)
    }

    fn create_country<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country> {
        self.inner.create_country(exec, name)
    }

    fn find_country_by_name<E: Executor>(&self, exec: &E, name: &str) -> RepoResult<Country> {
        self.inner.find_country_by_name(exec, name)
    }

    fn create_province<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> RepoResult<Province> {
        self.inner.create_province(exec, name, country_id)
    }

    fn find_province_by_name<E: Executor>(
        &self,
        _exec: &E,
        name: &str,
        _country_id: CountryId,
    ) -> RepoResult<Province> {
        Err(RepoError::NotFound {
            entity: "province",
            key: name.to_string(),
        })
    }

    fn create_locality<E: Executor>(&self, exec: &E, locality: &Locality) -> RepoResult<Locality> {
        self.inner.create_locality(exec, locality)
    }

    fn find_locality_by_id<E: Executor>(&self, exec: &E, id: &str) -> RepoResult<Locality> {
        self.inner.find_locality_by_id(exec, id)
    }

    fn find_geography_by_locality_id<E: Executor>(
        &self,
        exec: &E,
        id: &str,
    ) -> RepoResult<ResponseGeography> {
        self.inner.find_geography_by_locality_id(exec, id)
    }

    fn connection(&self) -> &Connection {
        self.inner.connection()
    }
}

#[test]
fn empty_store_creates_whole_hierarchy() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    let response = service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect("create on empty store should succeed");
    assert_eq!(
        response,
        ResponseGeography {
            locality_id: "1900".to_string(),
            locality_name: "La Plata".to_string(),
            province_name: "Buenos Aires".to_string(),
            country_name: "Argentina".to_string(),
        }
    );

    let repo = repo(&conn);
    let country = repo
        .find_country_by_name(&conn, "Argentina")
        .expect("country should be stored");
    let province = repo
        .find_province_by_name(&conn, "Buenos Aires", country.id)
        .expect("province should be stored");
    let locality = repo
        .find_locality_by_id(&conn, "1900")
        .expect("locality should be stored");
    assert_eq!(country.id, 1);
    assert_eq!(province.id, 1);
    assert_eq!(province.country_id, 1);
    assert_eq!(locality.province_id, 1);
}

#[test]
fn known_country_is_reused_for_new_province() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);
    service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect("seed create should succeed");

    let response = service
        .create(new_locality("5000", "Argentina", "Cordoba", "Cordoba Capital"))
        .expect("create under known country should succeed");
    assert_eq!(response.province_name, "Cordoba");

    let repo = repo(&conn);
    let province = repo
        .find_province_by_name(&conn, "Cordoba", 1)
        .expect("new province should hang off the existing country");
    assert_eq!(province.id, 2);
    let locality = repo
        .find_locality_by_id(&conn, "5000")
        .expect("locality should be stored");
    assert_eq!(locality.province_id, 2);
    assert_eq!(count(&conn, "countries"), 1);
}

#[test]
fn repeated_locality_id_conflicts_and_changes_nothing() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);
    service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect("seed create should succeed");

    let err = service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "Other Name"))
        .expect_err("repeated id should conflict");
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(err.message(), "locality already exists");
    assert_eq!(err.status().as_u16(), 409);

    let stored = service
        .get_locality("1900")
        .expect("original locality should still be readable");
    assert_eq!(stored.locality_name, "La Plata");
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
    assert_eq!(count(&conn, "localities"), 1);
}

#[test]
fn repeated_locality_id_under_new_ancestors_leaves_no_orphans() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);
    service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect("seed create should succeed");

    let err = service
        .create(new_locality("1900", "Uruguay", "Montevideo", "Centro"))
        .expect_err("repeated id should conflict");
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
}

#[test]
fn ancestors_resolve_idempotently() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    for (id, name) in [("1900", "La Plata"), ("1896", "City Bell"), ("1894", "Villa Elisa")] {
        service
            .create(new_locality(id, "Argentina", "Buenos Aires", name))
            .expect("create with known ancestors should succeed");
    }

    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
    assert_eq!(count(&conn, "localities"), 3);
}

#[test]
fn ancestor_names_match_case_insensitively() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    service
        .create(new_locality("1900", "argentina", "buenos aires", "La Plata"))
        .expect("lower-case create should succeed");
    let response = service
        .create(new_locality("1896", "ARGENTINA", "BUENOS AIRES", "City Bell"))
        .expect("upper-case create should reuse ancestors");

    assert_eq!(response.country_name, "argentina");
    assert_eq!(response.province_name, "buenos aires");
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
}

#[test]
fn same_province_name_under_other_country_is_new_row() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    service
        .create(new_locality("5000", "Argentina", "Cordoba", "Cordoba Capital"))
        .expect("Argentina create should succeed");
    service
        .create(new_locality("14001", "Spain", "Cordoba", "Cordoba Centro"))
        .expect("Spain create should succeed");

    assert_eq!(count(&conn, "countries"), 2);
    assert_eq!(count(&conn, "provinces"), 2);
}

#[test]
fn failed_locality_insert_rolls_back_new_ancestors() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    conn.execute_batch(
        "CREATE TRIGGER reject_locality_insert
         BEFORE INSERT ON localities
         BEGIN
             SELECT RAISE(ABORT, 'locality writes disabled');
         END;",
    )
    .expect("trigger should be created");
    let service = service(&conn);

    let err = service
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect_err("trigger should reject the locality insert");
    assert!(err.is(ErrorKind::Conflict));
    let detail = err.detail().expect("conflict should carry the store message");
    assert!(detail.contains("locality writes disabled"));

    assert_eq!(count(&conn, "countries"), 0);
    assert_eq!(count(&conn, "provinces"), 0);
    assert_eq!(count(&conn, "localities"), 0);
}

#[test]
fn duplicate_province_insert_maps_to_conflict_and_commits_nothing() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    service(&conn)
        .create(new_locality("1900", "Argentina", "Buenos Aires", "La Plata"))
        .expect("seed create should succeed");

    let blind = GeographyService::new(BlindProvinceLookup { inner: repo(&conn) });
    let err = blind
        .create(new_locality("1896", "Argentina", "Buenos Aires", "City Bell"))
        .expect_err("second province insert should trip the unique index");
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(
        err.detail(),
        Some("UNIQUE constraint failed: provinces.country_id, provinces.name_key")
    );

    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
    assert_eq!(count(&conn, "localities"), 1);
    let missing = repo(&conn).find_locality_by_id(&conn, "1896");
    assert!(matches!(missing, Err(RepoError::NotFound { .. })));
}

#[test]
fn concurrent_resolvers_share_one_country_and_province() {
    const WORKERS: usize = 8;
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("depot.sqlite3");
    let conn = open_db(&path).expect("file db should open and migrate");

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let path = path.as_path();
                scope.spawn(move || {
                    let conn = open_db(path).expect("worker connection should open");
                    service(&conn)
                        .create(new_locality(
                            &format!("19{worker:02}"),
                            "Argentina",
                            "Buenos Aires",
                            &format!("Locality {worker}"),
                        ))
                        .map(|response| response.locality_id)
                        .map_err(|err| err.kind())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect::<Vec<_>>()
    });

    for result in &results {
        assert!(result.is_ok(), "worker failed with {result:?}");
    }
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "provinces"), 1);
    assert_eq!(count(&conn, "localities"), WORKERS as i64);
}

#[test]
fn get_locality_reports_unknown_id_as_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    let err = service
        .get_locality("0000")
        .expect_err("unknown id should not resolve");
    assert!(err.is(ErrorKind::NotFound));
    assert_eq!(err.status().as_u16(), 404);
}

#[test]
fn decoded_request_flows_through_validation_into_create() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = service(&conn);

    let request: RequestGeography = serde_json::from_str(
        r#"{"id":"1900","country_name":" Argentina ","province_name":"Buenos Aires","locality_name":"La Plata"}"#,
    )
    .expect("request body should decode");
    let validated = request.validate().expect("complete request should validate");
    let response = service
        .create(validated)
        .expect("validated request should create");
    assert_eq!(response.country_name, "Argentina");

    let body = serde_json::to_value(&response).expect("response should serialize");
    assert_eq!(body["locality_id"], "1900");
    assert_eq!(body["province_name"], "Buenos Aires");
}

#[test]
fn incomplete_request_never_reaches_the_store() {
    let conn = open_db_in_memory().expect("in-memory db should open");

    let err = RequestGeography {
        id: Some("1900".to_string()),
        ..RequestGeography::default()
    }
    .validate()
    .expect_err("request without names should be rejected");
    assert!(err.is(ErrorKind::UnprocessableEntity));
    assert_eq!(
        err.detail(),
        Some("country_name,province_name,locality_name")
    );
    assert_eq!(count(&conn, "localities"), 0);
}
