//! Domain vocabulary shared across services: transaction/line/inventory
//! status enums, reference number allocation rules, and date helpers.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Transaction header classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
pub enum TransactionType {
    Inbound,
    Outbound,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
            Self::Adjustment => "Adjustment",
        }
    }

    /// Reference number prefix for this type (`IB-`, `OB-`, `ADJ-`).
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Inbound => "IB-",
            Self::Outbound => "OB-",
            Self::Adjustment => "ADJ-",
        }
    }

    /// Line statuses a detail under this header type may carry.
    pub fn allowed_statuses(&self) -> &'static [LineStatus] {
        match self {
            Self::Inbound => &[LineStatus::Pending, LineStatus::Received],
            Self::Outbound => &[LineStatus::Pending, LineStatus::Shipped],
            Self::Adjustment => &[LineStatus::Pending, LineStatus::Completed],
        }
    }

    pub fn permits(&self, status: LineStatus) -> bool {
        self.allowed_statuses().contains(&status)
    }

    /// The terminal status a Pending line advances to for this type.
    pub fn next_status(&self) -> LineStatus {
        match self {
            Self::Inbound => LineStatus::Received,
            Self::Outbound => LineStatus::Shipped,
            Self::Adjustment => LineStatus::Completed,
        }
    }
}

/// Lifecycle stage of a transaction detail line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
pub enum LineStatus {
    Pending,
    Shipped,
    Received,
    Completed,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Shipped => "Shipped",
            Self::Received => "Received",
            Self::Completed => "Completed",
        }
    }
}

/// Classification of stock within a warehouse, tracked independently
/// per item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
pub enum InventoryStatus {
    Stock,
    Consignment,
    Hold,
}

impl InventoryStatus {
    pub const ALL: [InventoryStatus; 3] = [
        InventoryStatus::Stock,
        InventoryStatus::Consignment,
        InventoryStatus::Hold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "Stock",
            Self::Consignment => "Consignment",
            Self::Hold => "Hold",
        }
    }
}

/// On-hand quantities for one item broken down by inventory status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OnHand {
    pub stock: Decimal,
    pub consignment: Decimal,
    pub hold: Decimal,
}

impl OnHand {
    pub fn total(&self) -> Decimal {
        self.stock + self.consignment + self.hold
    }

    pub fn is_zero(&self) -> bool {
        self.stock.is_zero() && self.consignment.is_zero() && self.hold.is_zero()
    }

    pub fn get(&self, status: InventoryStatus) -> Decimal {
        match status {
            InventoryStatus::Stock => self.stock,
            InventoryStatus::Consignment => self.consignment,
            InventoryStatus::Hold => self.hold,
        }
    }

    pub fn get_mut(&mut self, status: InventoryStatus) -> &mut Decimal {
        match status {
            InventoryStatus::Stock => &mut self.stock,
            InventoryStatus::Consignment => &mut self.consignment,
            InventoryStatus::Hold => &mut self.hold,
        }
    }
}

/// First sequence number handed out for any reference prefix.
pub const REFERENCE_SEQUENCE_START: i64 = 100_001;

/// Parses the numeric suffix out of a reference number such as
/// `ADJ-100042`. Returns `None` when the text after the last dash is not
/// a number.
pub fn reference_sequence(reference: &str) -> Option<i64> {
    reference.rsplit('-').next()?.parse().ok()
}

/// Computes the next reference number for a prefix given the highest
/// existing reference (or `None` when the prefix has never been used).
/// Unparseable suffixes fall back to the sequence start.
pub fn next_reference(prefix: &str, last: Option<&str>) -> String {
    let sequence = match last {
        Some(reference) => reference_sequence(reference).unwrap_or(REFERENCE_SEQUENCE_START - 1) + 1,
        None => REFERENCE_SEQUENCE_START,
    };
    format!("{}{}", prefix, sequence)
}

/// Adds `days` business days to `date`, skipping Saturdays and Sundays.
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        current = current.succ_opt().expect("date overflow");
        match current.weekday() {
            Weekday::Sat | Weekday::Sun => {}
            _ => remaining -= 1,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(TransactionType::Inbound, LineStatus::Pending, true)]
    #[test_case(TransactionType::Inbound, LineStatus::Received, true)]
    #[test_case(TransactionType::Inbound, LineStatus::Shipped, false)]
    #[test_case(TransactionType::Inbound, LineStatus::Completed, false)]
    #[test_case(TransactionType::Outbound, LineStatus::Shipped, true)]
    #[test_case(TransactionType::Outbound, LineStatus::Received, false)]
    #[test_case(TransactionType::Adjustment, LineStatus::Completed, true)]
    #[test_case(TransactionType::Adjustment, LineStatus::Shipped, false)]
    fn status_whitelist_per_type(ttype: TransactionType, status: LineStatus, allowed: bool) {
        assert_eq!(ttype.permits(status), allowed);
    }

    #[test]
    fn first_reference_starts_at_sequence_start() {
        assert_eq!(next_reference("IB-", None), "IB-100001");
        assert_eq!(next_reference("ADJ-", None), "ADJ-100001");
    }

    #[test]
    fn next_reference_increments_previous_suffix() {
        assert_eq!(next_reference("OB-", Some("OB-100041")), "OB-100042");
        // Gaps from deleted transactions are not refilled.
        assert_eq!(next_reference("IB-", Some("IB-100100")), "IB-100101");
    }

    #[test]
    fn unparseable_suffix_falls_back_to_start() {
        assert_eq!(next_reference("ADJ-", Some("ADJ-legacy")), "ADJ-100001");
    }

    #[test]
    fn business_days_skip_weekends() {
        // 2024-02-01 is a Thursday; two business days later is Monday.
        let thursday = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(
            add_business_days(thursday, 2),
            NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
        );
        // Friday + 1 lands on Monday.
        let friday = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        assert_eq!(
            add_business_days(friday, 1),
            NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
        );
        assert_eq!(add_business_days(friday, 0), friday);
    }

    #[test]
    fn on_hand_totals_and_zero_check() {
        let mut on_hand = OnHand::default();
        assert!(on_hand.is_zero());
        *on_hand.get_mut(InventoryStatus::Stock) += dec!(10);
        *on_hand.get_mut(InventoryStatus::Hold) += dec!(2.5);
        assert_eq!(on_hand.total(), dec!(12.5));
        assert!(!on_hand.is_zero());
        assert_eq!(on_hand.get(InventoryStatus::Consignment), dec!(0));
    }

    #[test]
    fn type_round_trips_through_strings() {
        for ttype in [
            TransactionType::Inbound,
            TransactionType::Outbound,
            TransactionType::Adjustment,
        ] {
            let parsed: TransactionType = ttype.as_str().parse().unwrap();
            assert_eq!(parsed, ttype);
        }
    }
}
