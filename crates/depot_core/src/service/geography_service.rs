//! Geography hierarchy resolution service.
//!
//! # Responsibility
//! - Resolve (find-or-create) Country and Province, then strictly create the
//!   Locality, all inside one transaction.
//! - Map repository failures to `AppError` kinds.
//!
//! # Invariants
//! - A call either commits every row it created or none of them.
//! - Country/Province resolution is idempotent; Locality creation is not:
//!   an existing locality id is a `Conflict`.
//! - The first failing step decides the returned error; rollback failures
//!   are logged and never replace it.

use crate::db::Executor;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::model::geography::{
    Country, CountryId, Locality, NewLocality, Province, ProvinceId, ResponseGeography,
};
use crate::repo::geography_repo::GeographyRepository;
use log::{error, info, warn};
use rusqlite::Transaction;
use std::time::Instant;

/// Use-case service for the geographic hierarchy.
pub struct GeographyService<R: GeographyRepository> {
    repo: R,
}

impl<R: GeographyRepository> GeographyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a locality, resolving its country and province on the way.
    ///
    /// # Errors
    /// - `Conflict` when the locality id already exists or a create step
    ///   trips a store constraint.
    /// - `Internal` when the transaction cannot begin or commit, or on any
    ///   other store failure.
    pub fn create(&self, request: NewLocality) -> AppResult<ResponseGeography> {
        let started_at = Instant::now();
        info!(
            "event=locality_create module=geography status=start locality_id={}",
            request.locality_id
        );

        let result = self.create_in_tx(&request);
        match &result {
            Ok(_) => info!(
                "event=locality_create module=geography status=ok locality_id={} duration_ms={}",
                request.locality_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.kind() == ErrorKind::Internal => error!(
                "event=locality_create module=geography status=error locality_id={} duration_ms={} error_code={} error={}",
                request.locality_id,
                started_at.elapsed().as_millis(),
                err.kind().code(),
                err
            ),
            Err(err) => warn!(
                "event=locality_create module=geography status=rejected locality_id={} duration_ms={} error_code={}",
                request.locality_id,
                started_at.elapsed().as_millis(),
                err.kind().code()
            ),
        }
        result
    }

    /// Loads the flattened hierarchy of an existing locality.
    ///
    /// # Errors
    /// - `NotFound` when no locality has `locality_id`.
    pub fn get_locality(&self, locality_id: &str) -> AppResult<ResponseGeography> {
        let conn = self.repo.connection();
        Ok(self
            .repo
            .find_geography_by_locality_id(conn, locality_id)?)
    }

    fn create_in_tx(&self, request: &NewLocality) -> AppResult<ResponseGeography> {
        let tx = self.repo.begin_tx().map_err(|err| {
            AppError::internal("failed to begin transaction").with_detail(err.to_string())
        })?;

        let resolved = self.resolve_all(&tx, request);
        let (country, province, locality) = match resolved {
            Ok(rows) => rows,
            Err(err) => {
                self.rollback(tx, &request.locality_id);
                return Err(err);
            }
        };

        self.repo.commit_tx(tx).map_err(|err| {
            AppError::internal("failed to commit transaction").with_detail(err.to_string())
        })?;

        Ok(ResponseGeography {
            locality_id: locality.id,
            locality_name: locality.name,
            province_name: province.name,
            country_name: country.name,
        })
    }

    fn resolve_all(
        &self,
        tx: &Transaction<'_>,
        request: &NewLocality,
    ) -> AppResult<(Country, Province, Locality)> {
        let country = self.handle_country(tx, &request.country_name)?;
        let province = self.handle_province(tx, &request.province_name, country.id)?;
        let locality = self.handle_locality(
            tx,
            &request.locality_id,
            &request.locality_name,
            province.id,
        )?;
        Ok((country, province, locality))
    }

    fn handle_country<E: Executor>(&self, exec: &E, name: &str) -> AppResult<Country> {
        match self.repo.find_country_by_name(exec, name).map_err(AppError::from) {
            Ok(country) => Ok(country),
            Err(err) if err.is(ErrorKind::NotFound) => {
                let country = self.repo.create_country(exec, name)?;
                info!(
                    "event=country_create module=geography status=ok country_id={}",
                    country.id
                );
                Ok(country)
            }
            Err(err) => Err(err),
        }
    }

    fn handle_province<E: Executor>(
        &self,
        exec: &E,
        name: &str,
        country_id: CountryId,
    ) -> AppResult<Province> {
        match self
            .repo
            .find_province_by_name(exec, name, country_id)
            .map_err(AppError::from)
        {
            Ok(province) => Ok(province),
            Err(err) if err.is(ErrorKind::NotFound) => {
                let province = self.repo.create_province(exec, name, country_id)?;
                info!(
                    "event=province_create module=geography status=ok province_id={} country_id={}",
                    province.id, country_id
                );
                Ok(province)
            }
            Err(err) => Err(err),
        }
    }

    fn handle_locality<E: Executor>(
        &self,
        exec: &E,
        locality_id: &str,
        name: &str,
        province_id: ProvinceId,
    ) -> AppResult<Locality> {
        match self
            .repo
            .find_locality_by_id(exec, locality_id)
            .map_err(AppError::from)
        {
            Ok(_) => Err(AppError::conflict("locality already exists").with_detail(locality_id)),
            Err(err) if err.is(ErrorKind::NotFound) => {
                let locality = Locality {
                    id: locality_id.to_string(),
                    name: name.to_string(),
                    province_id,
                };
                Ok(self.repo.create_locality(exec, &locality)?)
            }
            Err(err) => Err(err),
        }
    }

    fn rollback(&self, tx: Transaction<'_>, locality_id: &str) {
        match self.repo.rollback_tx(tx) {
            Ok(()) => info!(
                "event=tx_rollback module=geography status=ok locality_id={locality_id}"
            ),
            Err(err) => warn!(
                "event=tx_rollback module=geography status=error locality_id={locality_id} error={err}"
            ),
        }
    }
}
