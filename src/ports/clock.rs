use chrono::NaiveDate;

/// Source of the business date requests are evaluated on
#[mockall::automock]
pub trait ClockPort {
    fn today(&self) -> NaiveDate;
}
