use crate::{
    domain::{
        plan::Plan,
        voucher::{normalize_code, Voucher},
    },
    ports::{
        plan::{self, PlanCatalogPort},
        voucher::{self, VoucherPort},
    },
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    io::Read,
    path::Path,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

/// Seed file layout
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeed {
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub vouchers: Vec<Voucher>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read catalog seed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog seed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Entries {
    plans: HashMap<Uuid, Plan>,
    /// Vouchers keyed by normalized code
    vouchers: HashMap<String, Voucher>,
}

/// In-memory plan and voucher catalog
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCatalog {
    pub fn from_seed(seed: CatalogSeed) -> Result<Self, CatalogError> {
        let catalog = Self::default();
        for plan in seed.plans {
            catalog.insert_plan(plan)?;
        }
        for voucher in seed.vouchers {
            catalog.insert_voucher(voucher)?;
        }
        Ok(catalog)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        Self::from_seed(serde_json::from_reader(reader)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn insert_plan(&self, plan: Plan) -> Result<(), CatalogError> {
        self.entries
            .write()
            .map_err(|_| CatalogError::Poisoned)?
            .plans
            .insert(plan.id, plan);
        Ok(())
    }

    pub fn insert_voucher(&self, voucher: Voucher) -> Result<(), CatalogError> {
        self.entries
            .write()
            .map_err(|_| CatalogError::Poisoned)?
            .vouchers
            .insert(normalize_code(&voucher.code), voucher);
        Ok(())
    }

    pub fn plan_count(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.plans.len())
    }
}

#[async_trait::async_trait]
impl PlanCatalogPort for MemoryCatalog {
    async fn get_plan(&self, plan_id: Uuid) -> Result<Plan, plan::Error> {
        self.entries
            .read()
            .map_err(|_| plan::Error::Adapter(Box::new(CatalogError::Poisoned)))?
            .plans
            .get(&plan_id)
            .cloned()
            .ok_or(plan::Error::PlanDoesNotExist(plan_id))
    }
}

#[async_trait::async_trait]
impl VoucherPort for MemoryCatalog {
    async fn get_voucher(&self, code: &str) -> Result<Voucher, voucher::Error> {
        let code = normalize_code(code);
        self.entries
            .read()
            .map_err(|_| voucher::Error::Adapter(Box::new(CatalogError::Poisoned)))?
            .vouchers
            .get(&code)
            .cloned()
            .ok_or(voucher::Error::VoucherDoesNotExist(code))
    }
}
