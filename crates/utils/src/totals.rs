//! Money arithmetic for invoice and estimate line items.
//!
//! Amounts are `f64` on the wire and in the database, but every sum is done in
//! integer cents so that `total == subtotal - discount + vat` holds exactly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

pub fn round_money(amount: f64) -> f64 {
    from_cents(to_cents(amount))
}

/// Derived amounts of a single line, each rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct LineAmounts {
    pub subtotal: f64,
    pub discount: f64,
    pub vat: f64,
    pub total: f64,
}

/// Derived amounts of a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct DocumentTotals {
    pub subtotal: f64,
    pub discount_total: f64,
    pub vat_total: f64,
    pub total: f64,
}

impl DocumentTotals {
    pub fn is_consistent(&self) -> bool {
        to_cents(self.total)
            == to_cents(self.subtotal) - to_cents(self.discount_total) + to_cents(self.vat_total)
    }
}

/// Anything that carries the four inputs of a line item.
pub trait LineItemValues {
    fn quantity(&self) -> f64;
    fn unit_price(&self) -> f64;
    /// Percentage, 0..=100.
    fn discount_percent(&self) -> f64;
    /// Percentage, 0..=100.
    fn vat_rate(&self) -> f64;

    fn amounts(&self) -> LineAmounts {
        line_amounts(
            self.quantity(),
            self.unit_price(),
            self.discount_percent(),
            self.vat_rate(),
        )
    }
}

pub fn line_amounts(
    quantity: f64,
    unit_price: f64,
    discount_percent: f64,
    vat_rate: f64,
) -> LineAmounts {
    let net = to_cents(quantity * unit_price);
    let discount = (net as f64 * discount_percent / 100.0).round() as i64;
    let taxable = net - discount;
    let vat = (taxable as f64 * vat_rate / 100.0).round() as i64;

    LineAmounts {
        subtotal: from_cents(net),
        discount: from_cents(discount),
        vat: from_cents(vat),
        total: from_cents(taxable + vat),
    }
}

pub fn document_totals<'a, L, I>(lines: I) -> DocumentTotals
where
    L: LineItemValues + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let (mut subtotal, mut discount, mut vat) = (0i64, 0i64, 0i64);
    for line in lines {
        let amounts = line.amounts();
        subtotal += to_cents(amounts.subtotal);
        discount += to_cents(amounts.discount);
        vat += to_cents(amounts.vat);
    }

    DocumentTotals {
        subtotal: from_cents(subtotal),
        discount_total: from_cents(discount),
        vat_total: from_cents(vat),
        total: from_cents(subtotal - discount + vat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(f64, f64, f64, f64);

    impl LineItemValues for Line {
        fn quantity(&self) -> f64 {
            self.0
        }
        fn unit_price(&self) -> f64 {
            self.1
        }
        fn discount_percent(&self) -> f64 {
            self.2
        }
        fn vat_rate(&self) -> f64 {
            self.3
        }
    }

    #[test]
    fn line_total_matches_closed_formula() {
        let cases = [
            (1.0, 100.0, 0.0, 21.0),
            (3.0, 19.99, 10.0, 21.0),
            (2.5, 8.4, 0.0, 9.0),
            (7.0, 0.33, 50.0, 0.0),
        ];
        for (q, p, d, v) in cases {
            let amounts = line_amounts(q, p, d, v);
            let expected = q * p * (1.0 - d / 100.0) * (1.0 + v / 100.0);
            assert!(
                (amounts.total - expected).abs() <= 0.011,
                "{q} x {p} -{d}% +{v}%: got {} expected {expected}",
                amounts.total
            );
        }
    }

    #[test]
    fn rounding_happens_per_line() {
        let amounts = line_amounts(3.0, 19.99, 10.0, 21.0);
        assert_eq!(amounts.subtotal, 59.97);
        assert_eq!(amounts.discount, 6.0);
        assert_eq!(amounts.vat, 11.33);
        assert_eq!(amounts.total, 65.3);
    }

    #[test]
    fn document_totals_are_consistent() {
        let lines = vec![
            Line(3.0, 19.99, 10.0, 21.0),
            Line(1.0, 0.1, 0.0, 21.0),
            Line(12.0, 4.35, 5.0, 9.0),
        ];
        let totals = document_totals(&lines);
        assert!(totals.is_consistent());
        let line_sum: i64 = lines.iter().map(|l| to_cents(l.amounts().total)).sum();
        assert_eq!(to_cents(totals.total), line_sum);
    }

    #[test]
    fn empty_document_is_zero() {
        let lines: Vec<Line> = Vec::new();
        assert_eq!(document_totals(&lines), DocumentTotals::default());
    }
}
