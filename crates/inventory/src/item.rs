use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Entity, ItemId};

use crate::palindrome::{is_palindrome, palindrome_status};

/// Input for registering a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub min_stock: i64,
}

impl NewItem {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        min_stock: i64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category: category.into(),
            unit: unit.into(),
            min_stock,
        }
    }
}

/// Editable attributes of an existing item. The code is not among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanges {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub min_stock: i64,
}

impl ItemChanges {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        min_stock: i64,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            unit: unit.into(),
            min_stock,
        }
    }
}

/// Item master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    code: String,
    name: String,
    category: String,
    unit: String,
    min_stock: u32,
    palindrome: bool,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Item {
    /// Register a new item with a fresh id and the current time.
    pub fn create(new: NewItem) -> DomainResult<Self> {
        Self::create_with(ItemId::new(), Utc::now(), new)
    }

    /// Register a new item with an explicit id and creation time.
    pub fn create_with(id: ItemId, created_at: DateTime<Utc>, new: NewItem) -> DomainResult<Self> {
        let code = new.code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("item code is required"));
        }
        let name = required_name(&new.name)?;
        let min_stock = min_stock(new.min_stock)?;

        Ok(Self {
            id,
            code: code.to_string(),
            palindrome: is_palindrome(&name),
            name,
            category: new.category.trim().to_string(),
            unit: new.unit.trim().to_string(),
            min_stock,
            active: true,
            created_at,
        })
    }

    /// Return a copy with the editable attributes replaced.
    ///
    /// Id, code, active flag and creation time are carried over untouched; the
    /// palindrome flag is recomputed from the new name.
    pub fn update(&self, changes: ItemChanges) -> DomainResult<Self> {
        let name = required_name(&changes.name)?;
        let min_stock = min_stock(changes.min_stock)?;

        Ok(Self {
            id: self.id,
            code: self.code.clone(),
            palindrome: is_palindrome(&name),
            name,
            category: changes.category.trim().to_string(),
            unit: changes.unit.trim().to_string(),
            min_stock,
            active: self.active,
            created_at: self.created_at,
        })
    }

    /// Return an inactive copy (soft delete).
    pub fn deactivated(&self) -> Self {
        Self {
            active: false,
            ..self.clone()
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn min_stock(&self) -> u32 {
        self.min_stock
    }

    pub fn is_palindrome(&self) -> bool {
        self.palindrome
    }

    pub fn palindrome_status(&self) -> &'static str {
        palindrome_status(&self.name)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Case-insensitive substring match on code, name or category.
    ///
    /// An empty (or blank) query matches every item.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.code, &self.name, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Item {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

fn required_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("item name is required"));
    }
    Ok(name.to_string())
}

fn min_stock(value: i64) -> DomainResult<u32> {
    if value < 0 {
        return Err(DomainError::validation("minimum stock cannot be negative"));
    }
    u32::try_from(value).map_err(|_| DomainError::validation("minimum stock is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn racecar() -> NewItem {
        NewItem::new("A01", "racecar", "Tools", "pcs", 2)
    }

    #[test]
    fn create_item_sets_derived_flags() {
        let item = Item::create(racecar()).unwrap();
        assert!(item.is_palindrome());
        assert!(item.is_active());
        assert_eq!(item.min_stock(), 2);
        assert_eq!(item.code(), "A01");
        assert_eq!(item.unit(), "pcs");
    }

    #[test]
    fn each_created_item_gets_its_own_id() {
        let a = Item::create(racecar()).unwrap();
        let b = Item::create(racecar()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn create_rejects_blank_code_or_name() {
        let err = Item::create(NewItem::new("  ", "Hammer", "Tools", "pcs", 0)).unwrap_err();
        assert_eq!(err, DomainError::validation("item code is required"));

        let err = Item::create(NewItem::new("H1", "", "Tools", "pcs", 0)).unwrap_err();
        assert_eq!(err, DomainError::validation("item name is required"));
    }

    #[test]
    fn create_rejects_negative_min_stock() {
        let err = Item::create(NewItem::new("H1", "Hammer", "Tools", "pcs", -1)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("negative")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn fields_are_trimmed() {
        let item = Item::create(NewItem::new(" H1 ", " Hammer ", " Tools ", " pcs ", 0)).unwrap();
        assert_eq!(item.code(), "H1");
        assert_eq!(item.name(), "Hammer");
        assert_eq!(item.category(), "Tools");
        assert_eq!(item.unit(), "pcs");
    }

    #[test]
    fn update_recomputes_palindrome_and_keeps_identity() {
        let item = Item::create(racecar()).unwrap();
        let updated = item
            .update(ItemChanges::new("Socket wrench", "Hand tools", "box", 5))
            .unwrap();

        assert_eq!(updated.id(), item.id());
        assert_eq!(updated.code(), "A01");
        assert_eq!(updated.created_at(), item.created_at());
        assert!(!updated.is_palindrome());
        assert_eq!(updated.min_stock(), 5);
        assert_eq!(updated.category(), "Hand tools");
    }

    #[test]
    fn update_applies_same_validation() {
        let item = Item::create(racecar()).unwrap();
        assert!(item.update(ItemChanges::new(" ", "Tools", "pcs", 1)).is_err());
        assert!(item.update(ItemChanges::new("Kayak", "Tools", "pcs", -3)).is_err());
    }

    #[test]
    fn deactivated_copy_is_inactive() {
        let item = Item::create(racecar()).unwrap();
        let gone = item.deactivated();
        assert!(!gone.is_active());
        assert_eq!(gone.id(), item.id());
    }

    #[test]
    fn search_matches_code_name_and_category_case_insensitively() {
        let item = Item::create(NewItem::new("HX-9", "Claw Hammer", "Tools", "pcs", 0)).unwrap();
        assert!(item.matches(""));
        assert!(item.matches("hx"));
        assert!(item.matches("CLAW"));
        assert!(item.matches("tool"));
        assert!(!item.matches("drill"));
    }

    #[test]
    fn display_is_code_dash_name() {
        let item = Item::create(racecar()).unwrap();
        assert_eq!(item.to_string(), "A01 - racecar");
        assert_eq!(item.palindrome_status(), "Palindrome: YES");
    }
}
