//! Line-item editing for the invoice and estimate forms.

use db::models::{
    line_item::{LineItem, LineItemInput, validate_items},
    product::Product,
};
use utils::{
    totals::{DocumentTotals, LineAmounts, LineItemValues, document_totals},
    validation::FieldErrors,
};

/// Lines being edited in a form; totals are recomputed on every read with the
/// same cent arithmetic the server uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDraft {
    lines: Vec<LineItemInput>,
}

impl DocumentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the stored lines of an existing document.
    pub fn from_items(items: &[LineItem]) -> Self {
        Self {
            lines: items.iter().map(LineItemInput::from).collect(),
        }
    }

    pub fn lines(&self) -> &[LineItemInput] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_line(&mut self, line: LineItemInput) {
        self.lines.push(line);
    }

    /// Prefills description, price and VAT rate from the catalogue.
    pub fn add_product(&mut self, product: &Product, quantity: f64) {
        self.lines.push(LineItemInput {
            product_id: Some(product.id),
            description: product.name.clone(),
            quantity,
            unit_price: product.price,
            discount_percent: 0.0,
            vat_rate: product.vat_rate,
        });
    }

    /// Returns false when `index` is out of range.
    pub fn update_line(&mut self, index: usize, line: LineItemInput) -> bool {
        match self.lines.get_mut(index) {
            Some(existing) => {
                *existing = line;
                true
            }
            None => false,
        }
    }

    pub fn remove_line(&mut self, index: usize) -> Option<LineItemInput> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Moves a line to a new position; positions are saved in list order.
    pub fn move_line(&mut self, from: usize, to: usize) -> bool {
        if from >= self.lines.len() || to >= self.lines.len() {
            return false;
        }
        let line = self.lines.remove(from);
        self.lines.insert(to, line);
        true
    }

    pub fn line_amounts(&self, index: usize) -> Option<LineAmounts> {
        self.lines.get(index).map(LineItemValues::amounts)
    }

    pub fn totals(&self) -> DocumentTotals {
        document_totals(&self.lines)
    }

    /// Errors keyed `items.<index>.<field>`, matching the server's.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        validate_items(&self.lines, &mut errors);
        errors.into_result()
    }

    pub fn into_items(self) -> Vec<LineItemInput> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn line(description: &str, quantity: f64, unit_price: f64, discount: f64, vat: f64) -> LineItemInput {
        LineItemInput {
            product_id: None,
            description: description.to_string(),
            quantity,
            unit_price,
            discount_percent: discount,
            vat_rate: vat,
        }
    }

    #[test]
    fn totals_follow_line_edits() {
        let mut draft = DocumentDraft::new();
        draft.add_line(line("Consulting", 2.0, 100.0, 10.0, 21.0));
        draft.add_line(line("Travel", 1.0, 50.0, 0.0, 0.0));

        let first = draft.line_amounts(0).unwrap();
        assert_eq!(first.subtotal, 200.0);
        assert_eq!(first.discount, 20.0);
        assert_eq!(first.vat, 37.8);
        assert_eq!(first.total, 217.8);

        let totals = draft.totals();
        assert_eq!(totals.subtotal, 250.0);
        assert_eq!(totals.total, 267.8);
        assert!(totals.is_consistent());

        assert!(draft.update_line(1, line("Travel", 2.0, 50.0, 0.0, 0.0)));
        assert_eq!(draft.totals().total, 317.8);

        draft.remove_line(0);
        assert_eq!(draft.totals().total, 100.0);
        assert!(draft.remove_line(5).is_none());
    }

    #[test]
    fn product_lines_copy_catalogue_values() {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            sku: Some("W-1".to_string()),
            description: None,
            price: 19.99,
            vat_rate: 21.0,
            unit: None,
            stock_quantity: None,
            active: true,
            woocommerce_id: None,
            woocommerce_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut draft = DocumentDraft::new();
        draft.add_product(&product, 3.0);

        let line = &draft.lines()[0];
        assert_eq!(line.product_id, Some(product.id));
        assert_eq!(line.description, "Widget");
        assert_eq!(draft.totals().subtotal, 59.97);
    }

    #[test]
    fn move_line_reorders() {
        let mut draft = DocumentDraft::new();
        draft.add_line(line("a", 1.0, 1.0, 0.0, 0.0));
        draft.add_line(line("b", 1.0, 1.0, 0.0, 0.0));
        draft.add_line(line("c", 1.0, 1.0, 0.0, 0.0));
        assert!(draft.move_line(2, 0));
        let order: Vec<_> = draft.lines().iter().map(|l| l.description.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert!(!draft.move_line(0, 3));
    }

    #[test]
    fn validation_uses_indexed_keys() {
        let mut draft = DocumentDraft::new();
        draft.add_line(line("ok", 1.0, 1.0, 0.0, 21.0));
        draft.add_line(line("", 0.0, 1.0, 120.0, 21.0));
        let errors = draft.validate().unwrap_err();
        assert!(errors.get("items.1.description").is_some());
        assert!(errors.get("items.1.quantity").is_some());
        assert!(errors.get("items.1.discount_percent").is_some());
        assert!(errors.get("items.0.description").is_none());
    }
}
