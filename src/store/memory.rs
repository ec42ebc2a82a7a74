use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::bicycles::repo::BicycleRepo;
use crate::bicycles::repo_types::{Bicycle, BicycleFilter};
use crate::rentals::domain::{self, RentalError};
use crate::rentals::repo::RentalRepo;
use crate::rentals::repo_types::{Rental, RentalFilter};
use crate::store::StoreError;
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, User, UserChanges};

/// All three repositories over one mutex, so every operation is serialized the
/// way a row lock would serialize it.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    bicycles: BTreeMap<i64, Bicycle>,
    users: HashMap<Uuid, User>,
    rentals: BTreeMap<i64, Rental>,
    next_bicycle_id: i64,
    next_rental_id: i64,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store poisoned")))
    }
}

fn paged<T>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn bicycle_matches(f: &BicycleFilter, b: &Bicycle) -> bool {
    f.in_rent.map_or(true, |v| b.in_rent == v)
        && f.search
            .as_ref()
            .map_or(true, |q| b.model.to_lowercase().contains(&q.to_lowercase()))
}

fn rental_matches(f: &RentalFilter, r: &Rental) -> bool {
    f.bicycle_id.map_or(true, |id| r.bicycle_id == id)
        && f.renter_id.map_or(true, |id| r.renter_id == id)
        && f.is_returned.map_or(true, |v| r.is_returned == v)
}

#[async_trait]
impl BicycleRepo for MemoryStore {
    async fn list_available(&self) -> Result<Vec<Bicycle>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .bicycles
            .values()
            .filter(|b| !b.in_rent)
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &BicycleFilter) -> Result<Vec<Bicycle>, StoreError> {
        let inner = self.lock()?;
        let matching = inner.bicycles.values().filter(|b| bicycle_matches(filter, b)).cloned();
        Ok(paged(matching, filter.limit, filter.offset))
    }

    async fn create(&self, model: &str, price: Decimal) -> Result<Bicycle, StoreError> {
        let mut inner = self.lock()?;
        inner.next_bicycle_id += 1;
        let bicycle = Bicycle {
            id: inner.next_bicycle_id,
            model: model.to_string(),
            price,
            in_rent: false,
        };
        inner.bicycles.insert(bicycle.id, bicycle.clone());
        Ok(bicycle)
    }

    async fn update_price(&self, id: i64, price: Decimal) -> Result<Bicycle, StoreError> {
        let mut inner = self.lock()?;
        let bicycle = inner
            .bicycles
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Bicycle"))?;
        bicycle.price = price;
        Ok(bicycle.clone())
    }

    async fn set_in_rent(&self, ids: &[i64], in_rent: bool) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        // `id = ANY($1)` touches each row once, however often it is listed
        let unique: BTreeSet<i64> = ids.iter().copied().collect();
        for id in &unique {
            if let Some(b) = inner.bicycles.get_mut(id) {
                b.in_rent = in_rent;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_superuser: new.is_superuser,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let mut inner = self.lock()?;
        if let Some(email) = &changes.email {
            if inner.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::EmailTaken);
            }
        }
        let user = inner
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound("User"))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(user.clone())
    }

    async fn set_superuser(&self, id: Uuid, is_superuser: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound("User"))?;
        user.is_superuser = is_superuser;
        Ok(())
    }
}

#[async_trait]
impl RentalRepo for MemoryStore {
    async fn open(
        &self,
        bicycle_id: i64,
        renter_id: Uuid,
        start: OffsetDateTime,
    ) -> Result<Rental, StoreError> {
        let mut inner = self.lock()?;
        let bicycle = inner
            .bicycles
            .get(&bicycle_id)
            .ok_or(StoreError::UnknownBicycle(bicycle_id))?;
        domain::ensure_available(bicycle)?;
        if inner
            .rentals
            .values()
            .any(|r| r.bicycle_id == bicycle_id && !r.is_returned)
        {
            return Err(RentalError::BicycleInRent.into());
        }

        inner.next_rental_id += 1;
        let rental = Rental {
            id: inner.next_rental_id,
            bicycle_id,
            renter_id,
            start_time: start,
            end_time: None,
            total_cost: domain::to_cents(Decimal::ZERO),
            is_returned: false,
        };
        inner.rentals.insert(rental.id, rental.clone());
        if let Some(b) = inner.bicycles.get_mut(&bicycle_id) {
            b.in_rent = true;
        }
        Ok(rental)
    }

    async fn close(
        &self,
        rental_id: i64,
        end: Option<OffsetDateTime>,
    ) -> Result<Rental, StoreError> {
        let mut inner = self.lock()?;
        let mut rental = inner
            .rentals
            .get(&rental_id)
            .cloned()
            .ok_or(StoreError::NotFound("Rental"))?;
        let mut bicycle = inner
            .bicycles
            .get(&rental.bicycle_id)
            .cloned()
            .ok_or(StoreError::NotFound("Bicycle"))?;

        domain::close(&mut rental, &mut bicycle, end)?;

        inner.rentals.insert(rental.id, rental.clone());
        inner.bicycles.insert(bicycle.id, bicycle);
        Ok(rental)
    }

    async fn find(&self, id: i64) -> Result<Option<Rental>, StoreError> {
        Ok(self.lock()?.rentals.get(&id).cloned())
    }

    async fn list_by_renter(&self, renter_id: Uuid) -> Result<Vec<Rental>, StoreError> {
        let inner = self.lock()?;
        let mut rows: Vec<Rental> = inner
            .rentals
            .values()
            .filter(|r| r.renter_id == renter_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.start_time, b.id).cmp(&(a.start_time, a.id)));
        Ok(rows)
    }

    async fn list(&self, filter: &RentalFilter) -> Result<Vec<Rental>, StoreError> {
        let inner = self.lock()?;
        let mut rows: Vec<Rental> = inner
            .rentals
            .values()
            .filter(|r| rental_matches(filter, r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.start_time, b.id).cmp(&(a.start_time, a.id)));
        Ok(paged(rows.into_iter(), filter.limit, filter.offset))
    }
}
