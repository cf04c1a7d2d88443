//! Property-based tests for WIMS API core functionality.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use proptest::prelude::*;
use rust_decimal::Decimal;
use wims_api::models::{
    add_business_days, next_reference, InventoryStatus, LineStatus, TransactionType,
    REFERENCE_SEQUENCE_START,
};
use wims_api::services::counts::{compute_variances, CountLine};
use wims_api::services::inventory::{
    fold_movements, InventorySnapshot, Movement, SnapshotLine,
};
use wims_api::models::OnHand;

// Strategies for generating test data

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(Decimal::from)
}

fn date_strategy() -> impl Strategy<Value = chrono::NaiveDate> {
    (0u32..3650).prop_map(|offset| {
        chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(offset as u64))
            .unwrap()
    })
}

#[derive(Debug, Clone)]
enum LedgerOp {
    Received(Decimal),
    Shipped(Decimal),
    PendingInbound(Decimal),
    PendingOutbound(Decimal),
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        quantity_strategy().prop_map(LedgerOp::Received),
        quantity_strategy().prop_map(LedgerOp::Shipped),
        quantity_strategy().prop_map(LedgerOp::PendingInbound),
        quantity_strategy().prop_map(LedgerOp::PendingOutbound),
    ]
}

fn movement_for(op: &LedgerOp, date: chrono::NaiveDate) -> Movement {
    let (ttype, status, quantity) = match op {
        LedgerOp::Received(q) => (TransactionType::Inbound, LineStatus::Received, *q),
        LedgerOp::Shipped(q) => (TransactionType::Outbound, LineStatus::Shipped, *q),
        LedgerOp::PendingInbound(q) => (TransactionType::Inbound, LineStatus::Pending, *q),
        LedgerOp::PendingOutbound(q) => (TransactionType::Outbound, LineStatus::Pending, *q),
    };
    Movement {
        item_name: "Widget".into(),
        warehouse: "W1".into(),
        transaction_date: date,
        transaction_type: ttype,
        line_status: status,
        inventory_status: InventoryStatus::Stock,
        quantity,
    }
}

// Property: on-hand equals received minus shipped; Pending lines never
// touch on-hand.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn on_hand_is_received_minus_shipped(
        ops in prop::collection::vec((ledger_op_strategy(), date_strategy()), 0..40)
    ) {
        let movements: Vec<Movement> =
            ops.iter().map(|(op, date)| movement_for(op, *date)).collect();

        let mut expected_on_hand = Decimal::ZERO;
        let mut expected_on_order = Decimal::ZERO;
        let mut expected_committed = Decimal::ZERO;
        for (op, _) in &ops {
            match op {
                LedgerOp::Received(q) => expected_on_hand += q,
                LedgerOp::Shipped(q) => expected_on_hand -= q,
                LedgerOp::PendingInbound(q) => expected_on_order += q,
                LedgerOp::PendingOutbound(q) => expected_committed += q,
            }
        }

        let positions = fold_movements(movements);
        let key = ("Widget".to_string(), "W1".to_string(), InventoryStatus::Stock);
        match positions.get(&key) {
            Some(position) => {
                prop_assert_eq!(position.on_hand, expected_on_hand);
                prop_assert_eq!(position.on_order, expected_on_order);
                prop_assert_eq!(position.committed, expected_committed);
            }
            None => prop_assert!(ops.is_empty()),
        }
    }
}

fn count_line_strategy() -> impl Strategy<Value = CountLine> {
    (
        prop_oneof!["Widget", "Gizmo", "Gadget"],
        prop_oneof![
            Just(InventoryStatus::Stock),
            Just(InventoryStatus::Consignment),
            Just(InventoryStatus::Hold)
        ],
        quantity_strategy(),
    )
        .prop_map(|(item, status, quantity)| CountLine {
            item_name: item.to_string(),
            inventory_status: status,
            quantity,
            case_count: Decimal::ZERO,
            uom_per_each: None,
            notes: String::new(),
        })
}

fn snapshot_strategy() -> impl Strategy<Value = InventorySnapshot> {
    prop::collection::vec(
        (prop_oneof!["Widget", "Gizmo"], quantity_strategy()),
        0..3,
    )
    .prop_map(|entries| InventorySnapshot {
        warehouse: "W1".into(),
        as_of: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        lines: entries
            .into_iter()
            .map(|(item, stock)| SnapshotLine {
                item_name: item.to_string(),
                on_hand: OnHand {
                    stock,
                    consignment: Decimal::ZERO,
                    hold: Decimal::ZERO,
                },
                uom_per_each: None,
            })
            .collect(),
    })
}

// Property: variance computation is pure and idempotent, and every
// variance equals physical minus calculated.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn variance_computation_is_idempotent(
        lines in prop::collection::vec(count_line_strategy(), 0..10),
        snapshot in snapshot_strategy(),
    ) {
        let first = compute_variances(&lines, &snapshot);
        let second = compute_variances(&lines, &snapshot);
        prop_assert_eq!(&first, &second);

        for (line, variance) in lines.iter().zip(first.iter()) {
            prop_assert_eq!(
                variance.variance,
                variance.physical_count - variance.calculated_count
            );
            prop_assert_eq!(variance.physical_count, line.quantity);
        }
    }
}

// Property: reference numbers increment the previous suffix regardless of
// gaps, and every prefix starts at the same seed.
proptest! {
    #[test]
    fn reference_numbers_increment_previous_suffix(suffix in 100_001i64..10_000_000) {
        for prefix in ["IB-", "OB-", "ADJ-"] {
            let last = format!("{}{}", prefix, suffix);
            let next = next_reference(prefix, Some(&last));
            prop_assert_eq!(next, format!("{}{}", prefix, suffix + 1));
        }
    }

    #[test]
    fn first_reference_always_starts_at_the_seed(_any in 0u8..255) {
        for prefix in ["IB-", "OB-", "ADJ-"] {
            prop_assert_eq!(
                next_reference(prefix, None),
                format!("{}{}", prefix, REFERENCE_SEQUENCE_START)
            );
        }
    }
}

// Property: the status whitelist admits exactly the allowed subset per
// transaction type.
proptest! {
    #[test]
    fn status_whitelist_is_exact(
        ttype in prop_oneof![
            Just(TransactionType::Inbound),
            Just(TransactionType::Outbound),
            Just(TransactionType::Adjustment)
        ],
        status in prop_oneof![
            Just(LineStatus::Pending),
            Just(LineStatus::Shipped),
            Just(LineStatus::Received),
            Just(LineStatus::Completed)
        ],
    ) {
        let expected = match (ttype, status) {
            (_, LineStatus::Pending) => true,
            (TransactionType::Inbound, LineStatus::Received) => true,
            (TransactionType::Outbound, LineStatus::Shipped) => true,
            (TransactionType::Adjustment, LineStatus::Completed) => true,
            _ => false,
        };
        prop_assert_eq!(ttype.permits(status), expected);
    }
}

// Property: business-day offsets never land on a weekend and always move
// forward by at least the requested number of days.
proptest! {
    #[test]
    fn business_days_skip_weekends(date in date_strategy(), days in 1u32..15) {
        use chrono::Datelike;
        let result = add_business_days(date, days);
        prop_assert!(result > date);
        prop_assert!(!matches!(
            result.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        ));
        prop_assert!(result - date >= chrono::Duration::days(days as i64));
    }
}
