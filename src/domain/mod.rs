use std::borrow::Cow;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod contract;
pub mod enrollment;
pub mod fee;
pub mod plan;
pub mod voucher;

use self::{
    contract::Contract, enrollment::EnrollmentPreview, fee::round_money, voucher::VoucherRedemption,
};

/// Malformed input, rejected before any computation
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub Cow<'static, str>);

impl ValidationError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self(message.into())
    }
}

/// Text with an English value and an optional Arabic translation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: None,
        }
    }

    pub fn bilingual(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: Some(ar.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Unique identifier for the `Member`
    ///
    /// This is also used by other services.
    pub member_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub national_id: Option<String>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given date
    ///
    /// This is `None` when the date of birth is unknown.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let born = self.date_of_birth?;
        let mut age = date.year() - born.year();
        if (date.month(), date.day()) < (born.month(), born.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// Details for a member who joins as part of their enrollment
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub national_id: Option<String>,
}

impl NewMember {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ValidationError::new("member first and last name are required"));
        }
        if let Some(email) = &self.email {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
            if !valid {
                return Err(ValidationError::new(format!("invalid email address '{email}'")));
            }
        }
        Ok(())
    }

    pub fn into_member(self) -> Member {
        Member {
            member_id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            national_id: self.national_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    /// Created without payment, waiting for the invoice to be settled
    PendingPayment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub auto_renew: bool,
    pub paid_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub voucher_code: Option<String>,
    pub staff_notes: Option<String>,
}

impl Subscription {
    /// Whether the subscription still counts towards the one-live-subscription rule
    pub fn is_live_on(&self, date: NaiveDate) -> bool {
        date <= self.end_date
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Issued,
    PartiallyPaid,
    Paid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceLine {
    pub description: String,
    pub net: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub gross: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoice {
    pub invoice_id: Uuid,
    /// Assigned by the store on commit
    pub invoice_number: String,
    pub member_id: Uuid,
    pub subscription_id: Uuid,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
}

impl Invoice {
    /// Issue an invoice for the amounts of an accepted preview
    pub fn from_preview(
        preview: &EnrollmentPreview,
        member_id: Uuid,
        subscription_id: Uuid,
        paid_amount: Option<Decimal>,
        issued_on: NaiveDate,
    ) -> Self {
        let lines = preview
            .fee_lines()
            .into_iter()
            .filter(|line| line.applicable)
            .map(|line| InvoiceLine {
                description: line.label.en.clone(),
                net: line.net,
                tax_rate: line.tax_rate,
                tax_amount: line.tax_amount,
                gross: line.gross,
            })
            .collect();
        let paid_amount = round_money(paid_amount.unwrap_or(Decimal::ZERO));
        let status = if paid_amount >= preview.grand_total {
            InvoiceStatus::Paid
        } else if paid_amount > Decimal::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Issued
        };

        Self {
            invoice_id: Uuid::new_v4(),
            invoice_number: String::new(),
            member_id,
            subscription_id,
            currency: preview.currency.clone(),
            lines,
            subtotal: preview.subtotal,
            vat_total: preview.vat_total,
            discount_amount: preview.discount_amount.unwrap_or(round_money(Decimal::ZERO)),
            total: preview.grand_total,
            paid_amount,
            status,
            issued_on,
        }
    }
}

/// Member side of an enrollment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberRecord {
    /// Member already known to the member directory
    Existing(Member),
    /// Member created by this enrollment
    New(Member),
}

impl MemberRecord {
    pub fn member(&self) -> &Member {
        match self {
            MemberRecord::Existing(member) | MemberRecord::New(member) => member,
        }
    }
}

/// All the writes of one enrollment, committed together or not at all
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEnrollment {
    pub member: MemberRecord,
    pub subscription: Subscription,
    pub contract: Option<Contract>,
    pub invoice: Option<Invoice>,
    pub voucher: Option<VoucherRedemption>,
}

/// Committed enrollment outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enrollment {
    pub member: Member,
    pub member_created: bool,
    pub subscription: Subscription,
    pub contract: Option<Contract>,
    pub invoice: Option<Invoice>,
}
