use crate::{
    domain::{
        contract::Contract, voucher::VoucherUsage, Enrollment, Invoice, Member, MemberRecord,
        NewEnrollment, Subscription,
    },
    ports::{
        database::{DatabasePort, Error},
        member::{self, MemberPort},
    },
};
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
struct Tables {
    members: HashMap<Uuid, Member>,
    subscriptions: Vec<Subscription>,
    contracts: HashMap<Uuid, Contract>,
    /// Invoices keyed by invoice number
    invoices: HashMap<String, Invoice>,
    /// (voucher_id, member_id) for every redemption
    voucher_redemptions: Vec<(Uuid, Uuid)>,
    invoice_sequence: u64,
    contract_sequence: u64,
}

impl Tables {
    fn has_live_subscription(&self, member_id: Uuid, today: NaiveDate) -> bool {
        self.subscriptions.iter().any(|subscription| {
            subscription.member_id == member_id && subscription.is_live_on(today)
        })
    }

    fn voucher_usage(&self, voucher_id: Uuid, member_id: Option<Uuid>) -> VoucherUsage {
        let mut usage = VoucherUsage::default();
        for (_, redeemed_by) in self
            .voucher_redemptions
            .iter()
            .filter(|(redeemed, _)| *redeemed == voucher_id)
        {
            usage.total += 1;
            if Some(*redeemed_by) == member_id {
                usage.by_member += 1;
            }
        }
        usage
    }

    /// Apply every write of an enrollment, stopping at the first constraint violation
    ///
    /// A subscription that is still live on the new start date blocks the enrollment.
    fn apply(&mut self, enrollment: NewEnrollment) -> Result<Enrollment, Error> {
        let NewEnrollment {
            member,
            subscription,
            contract,
            invoice,
            voucher,
        } = enrollment;

        // Members
        let (member, member_created) = match member {
            MemberRecord::Existing(member) => {
                let stored = self
                    .members
                    .get(&member.member_id)
                    .cloned()
                    .ok_or(Error::MemberDoesNotExist(member.member_id))?;
                (stored, false)
            }
            MemberRecord::New(member) => {
                self.members.insert(member.member_id, member.clone());
                (member, true)
            }
        };

        // Subscriptions: one live subscription per member
        if self.has_live_subscription(member.member_id, subscription.start_date) {
            return Err(Error::ActiveSubscriptionExists(member.member_id));
        }
        self.subscriptions.push(subscription.clone());

        // Contracts
        let contract = contract.map(|mut contract| {
            self.contract_sequence += 1;
            contract.contract_number = format!("CTR-{:06}", self.contract_sequence);
            self.contracts.insert(contract.id, contract.clone());
            contract
        });

        // Invoices: numbers must be unique
        let invoice = match invoice {
            Some(mut invoice) => {
                if invoice.invoice_number.is_empty() {
                    self.invoice_sequence += 1;
                    invoice.invoice_number = format!("INV-{:06}", self.invoice_sequence);
                }
                if self.invoices.contains_key(&invoice.invoice_number) {
                    return Err(Error::DuplicateInvoiceNumber(invoice.invoice_number));
                }
                self.invoices
                    .insert(invoice.invoice_number.clone(), invoice.clone());
                Some(invoice)
            }
            None => None,
        };

        // Voucher redemptions: limits are counted again against committed redemptions
        if let Some(voucher) = voucher {
            let usage = self.voucher_usage(voucher.voucher_id, Some(member.member_id));
            if voucher.max_uses.is_some_and(|max| usage.total >= max)
                || usage.by_member >= voucher.max_uses_per_member
            {
                return Err(Error::VoucherLimitReached(voucher.code));
            }
            self.voucher_redemptions
                .push((voucher.voucher_id, member.member_id));
        }

        Ok(Enrollment {
            member,
            member_created,
            subscription,
            contract,
            invoice,
        })
    }
}

/// In-memory store for members, subscriptions, contracts and invoices
#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    /// Register a member directly, without an enrollment
    pub fn insert_member(&self, member: Member) -> Result<(), Error> {
        self.tables.lock()?.members.insert(member.member_id, member);
        Ok(())
    }

    pub fn member(&self, member_id: Uuid) -> Result<Option<Member>, Error> {
        Ok(self.tables.lock()?.members.get(&member_id).cloned())
    }

    pub fn subscriptions_for(&self, member_id: Uuid) -> Result<Vec<Subscription>, Error> {
        Ok(self
            .tables
            .lock()?
            .subscriptions
            .iter()
            .filter(|subscription| subscription.member_id == member_id)
            .cloned()
            .collect())
    }

    pub fn contracts_for(&self, member_id: Uuid) -> Result<Vec<Contract>, Error> {
        Ok(self
            .tables
            .lock()?
            .contracts
            .values()
            .filter(|contract| contract.member_id == member_id)
            .cloned()
            .collect())
    }

    pub fn invoices_for(&self, member_id: Uuid) -> Result<Vec<Invoice>, Error> {
        Ok(self
            .tables
            .lock()?
            .invoices
            .values()
            .filter(|invoice| invoice.member_id == member_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn count_subscriptions(&self, member_id: Uuid) -> Result<u32, Error> {
        let count = self
            .tables
            .lock()?
            .subscriptions
            .iter()
            .filter(|subscription| subscription.member_id == member_id)
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn has_active_subscription(&self, member_id: Uuid, on: NaiveDate) -> Result<bool, Error> {
        Ok(self.tables.lock()?.has_live_subscription(member_id, on))
    }

    async fn voucher_usage(
        &self,
        voucher_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<VoucherUsage, Error> {
        Ok(self.tables.lock()?.voucher_usage(voucher_id, member_id))
    }

    async fn commit_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, Error> {
        let mut tables = self.tables.lock()?;

        // Writes go to a staged copy that only replaces the live tables once every constraint
        // held, so a failure leaves no partial enrollment behind.
        let mut staged = tables.clone();
        let enrollment = staged.apply(enrollment)?;
        *tables = staged;

        Ok(enrollment)
    }
}

#[async_trait::async_trait]
impl MemberPort for MemoryDatabase {
    async fn get_member(&self, member_id: Uuid) -> Result<Member, member::Error> {
        self.tables
            .lock()
            .map_err(|err| member::Error::Adapter(Box::new(ErasedPoisonError(err.to_string()))))?
            .members
            .get(&member_id)
            .cloned()
            .ok_or(member::Error::MemberDoesNotExist(member_id))
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

/// We need to create a custom `From` implementation here for an error that's specific to this
/// adapter.
impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
