//! Applying adjustment catalogs to prices.
//!
//! Catalogs apply in ascending `priority` order. `Add` contributes its
//! magnitude directly (winc for uploads, currency units for payments);
//! `Multiply` scales the running amount. The running amount clamps at zero,
//! and the delta each catalog actually contributed (negative for discounts)
//! is recorded on its Applied row.

use rust_decimal::Decimal;
use winc_common::{bytes::ByteCount, time::TimestampMs, winc::Winc};

use crate::entities::{
    AdjustmentCatalog, AdjustmentCatalogKind, AdjustmentOperator,
    AppliedAdjustment, AppliedPaymentAdjustment, CatalogId,
};

/// The outcome of applying upload catalogs to a network price.
#[derive(Clone, Debug)]
pub struct UploadPrice {
    pub final_winc: Winc,
    pub applied: Vec<AppliedAdjustment>,
}

/// The outcome of applying payment catalogs to a quoted fiat amount.
#[derive(Clone, Debug)]
pub struct PaymentPrice {
    pub final_amount: Decimal,
    pub applied: Vec<AppliedPaymentAdjustment>,
}

/// Applies the active upload catalogs to `network_winc`.
///
/// Catalogs with a byte-count threshold skip uploads below it. A configured
/// `max_discount` bounds how far multiplicative catalogs may cut a single
/// step (e.g. `0.4` caps each multiply at a 40% reduction).
pub fn apply_upload_adjustments(
    network_winc: &Winc,
    byte_count: Option<ByteCount>,
    catalogs: &[AdjustmentCatalog],
    max_discount: Option<Decimal>,
    now: TimestampMs,
) -> UploadPrice {
    let mut catalogs = catalogs
        .iter()
        .filter(|catalog| catalog.is_active(now))
        .filter(|catalog| match &catalog.kind {
            AdjustmentCatalogKind::Upload {
                byte_count_threshold,
                ..
            } => match (byte_count_threshold, byte_count) {
                (Some(threshold), Some(bytes)) => bytes >= *threshold,
                (Some(_), None) => false,
                (None, _) => true,
            },
            _ => false,
        })
        .collect::<Vec<_>>();
    catalogs.sort_by_key(|catalog| catalog.priority);

    let mut running = network_winc.clone();
    let mut applied = Vec::new();

    for catalog in catalogs {
        let next = match catalog.operator {
            AdjustmentOperator::Add => {
                add_winc(&running, catalog.operator_magnitude)
            }
            AdjustmentOperator::Multiply => {
                let magnitude =
                    clamp_multiplier(catalog.operator_magnitude, max_discount);
                running
                    .mul_decimal_floor(magnitude)
                    .unwrap_or_else(|_| running.clone())
            }
        };
        let delta = next.signed_diff(&running);
        if !delta.is_zero() {
            applied.push(AppliedAdjustment {
                catalog_id: catalog.catalog_id.clone(),
                adjusted_amount: delta,
            });
        }
        running = next;
    }

    UploadPrice {
        final_winc: running,
        applied,
    }
}

/// Applies the active payment catalogs to the quoted fiat amount.
///
/// `promo_codes` are the codes the caller presented; a single-use catalog
/// applies only when its code was presented and `already_used` denies prior
/// use. An exclusive catalog suppresses every lower-priority entry.
pub fn apply_payment_adjustments(
    quoted_amount: Decimal,
    promo_codes: &[String],
    already_used: impl Fn(&CatalogId) -> bool,
    catalogs: &[AdjustmentCatalog],
    now: TimestampMs,
) -> PaymentPrice {
    let mut catalogs = catalogs
        .iter()
        .filter(|catalog| catalog.is_active(now))
        .filter(|catalog| match &catalog.kind {
            AdjustmentCatalogKind::Payment { .. } => true,
            AdjustmentCatalogKind::SingleUseCodePayment { code, .. } => {
                promo_codes.iter().any(|presented| presented == code)
                    && !already_used(&catalog.catalog_id)
            }
            AdjustmentCatalogKind::Upload { .. } => false,
        })
        .collect::<Vec<_>>();
    catalogs.sort_by_key(|catalog| catalog.priority);

    let mut running = quoted_amount;
    let mut applied = Vec::new();

    for catalog in catalogs {
        let next = match catalog.operator {
            AdjustmentOperator::Add =>
                (running + catalog.operator_magnitude).max(Decimal::ZERO),
            AdjustmentOperator::Multiply =>
                (running * catalog.operator_magnitude).max(Decimal::ZERO),
        };
        let delta = next - running;
        if !delta.is_zero() {
            applied.push(AppliedPaymentAdjustment {
                catalog_id: catalog.catalog_id.clone(),
                adjusted_payment_amount: delta,
            });
        }
        running = next;

        let exclusive = match &catalog.kind {
            AdjustmentCatalogKind::Payment { exclusive } => *exclusive,
            AdjustmentCatalogKind::SingleUseCodePayment {
                exclusive, ..
            } => *exclusive,
            AdjustmentCatalogKind::Upload { .. } => false,
        };
        if exclusive {
            break;
        }
    }

    PaymentPrice {
        final_amount: running,
        applied,
    }
}

/// Adds a signed winc magnitude to `running`, clamping at zero.
fn add_winc(running: &Winc, magnitude: Decimal) -> Winc {
    let delta = magnitude.abs().trunc().normalize();
    let delta_winc = delta
        .to_string()
        .parse::<Winc>()
        .unwrap_or_else(|_| Winc::zero());
    if magnitude.is_sign_negative() {
        running.saturating_sub(&delta_winc)
    } else {
        running.clone() + delta_winc
    }
}

/// Bounds a multiplicative magnitude so a single step cannot discount more
/// than `max_discount` (a fraction in `0..=1`).
fn clamp_multiplier(
    magnitude: Decimal,
    max_discount: Option<Decimal>,
) -> Decimal {
    match max_discount {
        Some(max_discount) => magnitude.max(Decimal::ONE - max_discount),
        None => magnitude,
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;
    use winc_common::time::TimestampMs;

    use super::*;

    fn upload_catalog(
        id: &str,
        priority: u32,
        operator: AdjustmentOperator,
        magnitude: Decimal,
    ) -> AdjustmentCatalog {
        AdjustmentCatalog {
            catalog_id: CatalogId::new(id),
            name: id.to_owned(),
            start_date: TimestampMs::EPOCH,
            end_date: None,
            priority,
            operator,
            operator_magnitude: magnitude,
            kind: AdjustmentCatalogKind::Upload {
                byte_count_threshold: None,
                winc_limitation: None,
            },
        }
    }

    #[test]
    fn applies_in_priority_order() {
        let now = TimestampMs::from_millis(1).unwrap();
        // Multiply first (priority 1), then subtract.
        let catalogs = vec![
            upload_catalog("sub", 2, AdjustmentOperator::Add, dec!(-100)),
            upload_catalog("half", 1, AdjustmentOperator::Multiply, dec!(0.5)),
        ];
        let price = apply_upload_adjustments(
            &Winc::from(1000u64),
            None,
            &catalogs,
            None,
            now,
        );
        // 1000 * 0.5 = 500, 500 - 100 = 400.
        assert_eq!(price.final_winc, Winc::from(400u64));
        assert_eq!(price.applied.len(), 2);
        assert_eq!(price.applied[0].catalog_id, CatalogId::new("half"));
        assert_eq!(
            price.applied[0].adjusted_amount.to_string(),
            "-500",
        );
        assert_eq!(price.applied[1].adjusted_amount.to_string(), "-100");
    }

    #[test]
    fn add_clamps_at_zero() {
        let now = TimestampMs::from_millis(1).unwrap();
        let catalogs = vec![upload_catalog(
            "big-sub",
            1,
            AdjustmentOperator::Add,
            dec!(-5000),
        )];
        let price = apply_upload_adjustments(
            &Winc::from(1000u64),
            None,
            &catalogs,
            None,
            now,
        );
        assert!(price.final_winc.is_zero());
        assert_eq!(price.applied[0].adjusted_amount.to_string(), "-1000");
    }

    #[test]
    fn multiply_respects_max_discount() {
        let now = TimestampMs::from_millis(1).unwrap();
        let catalogs = vec![upload_catalog(
            "deep-discount",
            1,
            AdjustmentOperator::Multiply,
            dec!(0.1),
        )];
        let price = apply_upload_adjustments(
            &Winc::from(1000u64),
            None,
            &catalogs,
            Some(dec!(0.4)),
            now,
        );
        // Clamped to a 40% discount: 1000 * 0.6.
        assert_eq!(price.final_winc, Winc::from(600u64));
    }

    #[test]
    fn inactive_catalogs_are_skipped() {
        let now = TimestampMs::from_millis(1_000).unwrap();
        let mut catalog =
            upload_catalog("old", 1, AdjustmentOperator::Multiply, dec!(0.5));
        catalog.end_date = Some(TimestampMs::from_millis(500).unwrap());
        let price = apply_upload_adjustments(
            &Winc::from(1000u64),
            None,
            &[catalog],
            None,
            now,
        );
        assert_eq!(price.final_winc, Winc::from(1000u64));
        assert!(price.applied.is_empty());
    }

    #[test]
    fn byte_threshold_gates_upload_catalogs() {
        let now = TimestampMs::from_millis(1).unwrap();
        let mut catalog =
            upload_catalog("big-only", 1, AdjustmentOperator::Multiply, dec!(0.5));
        catalog.kind = AdjustmentCatalogKind::Upload {
            byte_count_threshold: Some(ByteCount::new(1_000_000).unwrap()),
            winc_limitation: None,
        };

        let small = apply_upload_adjustments(
            &Winc::from(1000u64),
            Some(ByteCount::new(100).unwrap()),
            std::slice::from_ref(&catalog),
            None,
            now,
        );
        assert_eq!(small.final_winc, Winc::from(1000u64));

        let large = apply_upload_adjustments(
            &Winc::from(1000u64),
            Some(ByteCount::new(2_000_000).unwrap()),
            std::slice::from_ref(&catalog),
            None,
            now,
        );
        assert_eq!(large.final_winc, Winc::from(500u64));
    }

    #[test]
    fn single_use_code_requires_presentation_and_first_use() {
        let now = TimestampMs::from_millis(1).unwrap();
        let catalog = AdjustmentCatalog {
            catalog_id: CatalogId::new("promo23"),
            name: "promo23".to_owned(),
            start_date: TimestampMs::EPOCH,
            end_date: None,
            priority: 1,
            operator: AdjustmentOperator::Multiply,
            operator_magnitude: dec!(0.8),
            kind: AdjustmentCatalogKind::SingleUseCodePayment {
                code: "WELCOME23".to_owned(),
                exclusive: false,
            },
        };
        let catalogs = vec![catalog];

        // Not presented: no change.
        let price = apply_payment_adjustments(
            dec!(100),
            &[],
            |_| false,
            &catalogs,
            now,
        );
        assert_eq!(price.final_amount, dec!(100));

        // Presented and unused: applies.
        let price = apply_payment_adjustments(
            dec!(100),
            &["WELCOME23".to_owned()],
            |_| false,
            &catalogs,
            now,
        );
        assert_eq!(price.final_amount, dec!(80.0));
        assert_eq!(
            price.applied[0].adjusted_payment_amount,
            dec!(-20.0),
        );

        // Presented but already used: no change.
        let price = apply_payment_adjustments(
            dec!(100),
            &["WELCOME23".to_owned()],
            |_| true,
            &catalogs,
            now,
        );
        assert_eq!(price.final_amount, dec!(100));
    }

    #[test]
    fn exclusive_catalog_suppresses_lower_priority() {
        let now = TimestampMs::from_millis(1).unwrap();
        let exclusive = AdjustmentCatalog {
            catalog_id: CatalogId::new("exclusive"),
            name: "exclusive".to_owned(),
            start_date: TimestampMs::EPOCH,
            end_date: None,
            priority: 1,
            operator: AdjustmentOperator::Multiply,
            operator_magnitude: dec!(0.9),
            kind: AdjustmentCatalogKind::Payment { exclusive: true },
        };
        let later = AdjustmentCatalog {
            catalog_id: CatalogId::new("later"),
            name: "later".to_owned(),
            start_date: TimestampMs::EPOCH,
            end_date: None,
            priority: 2,
            operator: AdjustmentOperator::Multiply,
            operator_magnitude: dec!(0.5),
            kind: AdjustmentCatalogKind::Payment { exclusive: false },
        };

        let price = apply_payment_adjustments(
            dec!(100),
            &[],
            |_| false,
            &[exclusive, later],
            now,
        );
        assert_eq!(price.final_amount, dec!(90.0));
        assert_eq!(price.applied.len(), 1);
    }
}
