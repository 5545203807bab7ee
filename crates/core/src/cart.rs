//! Shopping cart snapshot.
//!
//! A cart line is identified by `(product id, unit key)`. Buying the same
//! product in another unit is a second, independent line. Totals (GST,
//! delivery, discount) are computed by the backend and carried verbatim; the
//! only number derived on the client is the line subtotal.

use core::fmt;

use crate::types::{Price, ProductId, RateOption, RateSelection, UnitKey, UserId};

/// Errors raised while building or mutating a [`Cart`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Two lines share a key.
    #[error("duplicate cart line {0}")]
    DuplicateLine(LineKey),
    /// A line carries quantity 0.
    #[error("cart line {0} has zero quantity")]
    ZeroQuantity(LineKey),
    /// The addressed line does not exist.
    #[error("no cart line {0}")]
    LineNotFound(LineKey),
    /// A line names the placeholder unit.
    #[error("cart line for product {0} has no unit")]
    MissingUnit(ProductId),
    /// The merged quantity does not fit in a `u32`.
    #[error("quantity of cart line {0} is too large")]
    QuantityOverflow(LineKey),
}

/// Composite key of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    /// Product id.
    pub product_id: ProductId,
    /// Unit label.
    pub unit: UnitKey,
}

impl LineKey {
    /// Create a line key.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, unit: impl Into<UnitKey>) -> Self {
        Self {
            product_id: product_id.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product_id, self.unit)
    }
}

/// Display fields copied onto a line when it is added.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineDisplay {
    /// Product name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Category label.
    pub category: String,
}

impl LineDisplay {
    /// Name of the first blank field, if any.
    #[must_use]
    pub fn first_missing(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("prod_Name")
        } else if self.image.trim().is_empty() {
            Some("image")
        } else if self.category.trim().is_empty() {
            Some("prod_category")
        } else {
            None
        }
    }
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Product id.
    pub product_id: ProductId,
    /// Selected unit and its unit price.
    pub rate: RateSelection,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Denormalized display fields.
    pub display: LineDisplay,
    /// The product's rate list at add-time.
    pub rates: Vec<RateOption>,
}

impl CartLine {
    /// Key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            unit: self.rate.key.clone(),
        }
    }

    /// Whether this line has the given key.
    #[must_use]
    pub fn has_key(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.rate.key == key.unit
    }

    /// Unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.rate.value
    }

    /// `quantity × unit price`, computed on demand.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.rate.value.times(self.quantity)
    }
}

/// Server-computed cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of line subtotals.
    pub total: Price,
    /// Goods and services tax.
    pub gst: Price,
    /// Delivery charge.
    pub delivery_charge: Price,
    /// Discount.
    pub discount: Price,
    /// `total + gst + delivery_charge - discount`.
    pub grand_total: Price,
}

/// A line-level change, keyed the way the backend keys it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Append a line, or add to the quantity of the line with the same key.
    Add(CartLine),
    /// Set the quantity of a line, optionally moving it to another unit.
    /// Quantity 0 removes the line.
    SetQuantity {
        /// Line being changed (its current unit).
        key: LineKey,
        /// New quantity.
        quantity: u32,
        /// Unit to move the line to.
        new_rate: Option<RateSelection>,
    },
    /// Delete a line.
    Remove(LineKey),
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cart {
    owner: Option<UserId>,
    lines: Vec<CartLine>,
    totals: CartTotals,
}

impl Cart {
    /// An empty cart with all totals zero.
    #[must_use]
    pub fn empty(owner: Option<UserId>) -> Self {
        Self {
            owner,
            lines: Vec::new(),
            totals: CartTotals::default(),
        }
    }

    /// Build a cart, checking the line invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if two lines share a key, a line has quantity
    /// 0, or a line names no unit.
    pub fn from_parts(
        owner: Option<UserId>,
        lines: Vec<CartLine>,
        totals: CartTotals,
    ) -> Result<Self, CartError> {
        for (i, line) in lines.iter().enumerate() {
            if line.rate.is_placeholder() {
                return Err(CartError::MissingUnit(line.product_id.clone()));
            }
            if line.quantity == 0 {
                return Err(CartError::ZeroQuantity(line.key()));
            }
            let key = line.key();
            if lines.iter().skip(i + 1).any(|other| other.has_key(&key)) {
                return Err(CartError::DuplicateLine(key));
            }
        }
        Ok(Self {
            owner,
            lines,
            totals,
        })
    }

    /// Owning user.
    #[must_use]
    pub const fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    /// The same cart attributed to `owner`.
    #[must_use]
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Whether the cart belongs to `user`.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref() == Some(user)
    }

    /// Lines in server order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Server totals.
    #[must_use]
    pub const fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Replace the totals (used by whoever owns the pricing rules).
    pub const fn set_totals(&mut self, totals: CartTotals) {
        self.totals = totals;
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line subtotals as derived on the client.
    #[must_use]
    pub fn lines_subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Look up a line by key.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.has_key(key))
    }

    /// All lines for one product, in cart order.
    pub fn lines_for<'a>(&'a self, product_id: &'a ProductId) -> impl Iterator<Item = &'a CartLine> {
        self.lines.iter().filter(move |l| &l.product_id == product_id)
    }

    /// Apply a line-level change with the backend's keying rules.
    ///
    /// Adding an existing key increments its quantity; setting quantity 0
    /// removes the line; moving a line onto a unit that already has a line
    /// merges the two. Totals are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if an update or removal addresses
    /// a missing line, [`CartError::ZeroQuantity`] for an empty add, and
    /// [`CartError::QuantityOverflow`] if merging lines overflows. A failed
    /// mutation leaves the cart unchanged.
    pub fn apply(&mut self, mutation: CartMutation) -> Result<(), CartError> {
        match mutation {
            CartMutation::Add(line) => {
                if line.rate.is_placeholder() {
                    return Err(CartError::MissingUnit(line.product_id));
                }
                if line.quantity == 0 {
                    return Err(CartError::ZeroQuantity(line.key()));
                }
                let key = line.key();
                if let Some(existing) = self.lines.iter_mut().find(|l| l.has_key(&key)) {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(CartError::QuantityOverflow(key))?;
                } else {
                    self.lines.push(line);
                }
            }
            CartMutation::SetQuantity {
                key,
                quantity,
                new_rate,
            } => {
                let index = self.position(&key)?;
                if quantity == 0 {
                    self.lines.remove(index);
                    return Ok(());
                }
                match new_rate.filter(|r| r.key != key.unit) {
                    None => {
                        if let Some(line) = self.lines.get_mut(index) {
                            line.quantity = quantity;
                        }
                    }
                    Some(rate) => {
                        let target = LineKey::new(key.product_id.clone(), rate.key.clone());
                        if let Ok(target_index) = self.position(&target) {
                            if let Some(line) = self.lines.get_mut(target_index) {
                                line.quantity = line
                                    .quantity
                                    .checked_add(quantity)
                                    .ok_or(CartError::QuantityOverflow(target))?;
                            }
                            self.lines.remove(index);
                        } else if let Some(line) = self.lines.get_mut(index) {
                            line.rate = rate;
                            line.quantity = quantity;
                        }
                    }
                }
            }
            CartMutation::Remove(key) => {
                let index = self.position(&key)?;
                self.lines.remove(index);
            }
        }
        Ok(())
    }

    fn position(&self, key: &LineKey) -> Result<usize, CartError> {
        self.lines
            .iter()
            .position(|l| l.has_key(key))
            .ok_or_else(|| CartError::LineNotFound(key.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: &str, unit: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            rate: RateSelection::new(unit, Price::from_rupees(price)),
            quantity,
            display: LineDisplay {
                name: "Apple".to_string(),
                image: "apple.jpg".to_string(),
                category: "Fruits".to_string(),
            },
            rates: vec![],
        }
    }

    fn count(cart: &Cart, product: &str, unit: &str) -> usize {
        let key = LineKey::new(product, unit);
        cart.lines().iter().filter(|l| l.has_key(&key)).count()
    }

    #[test]
    fn test_add_same_key_increments() {
        let mut cart = Cart::empty(Some(UserId::new("u1")));
        cart.apply(CartMutation::Add(line("A", "1kg", 50, 1))).unwrap();
        assert_eq!(cart.lines_subtotal(), Price::from_rupees(50));

        cart.apply(CartMutation::Add(line("A", "1kg", 50, 1))).unwrap();
        assert_eq!(cart.len(), 1);
        let l = cart.line(&LineKey::new("A", "1kg")).unwrap();
        assert_eq!(l.quantity, 2);
        assert_eq!(l.subtotal(), Price::from_rupees(100));
    }

    #[test]
    fn test_merge_overflow_is_an_error() {
        let mut cart = Cart::empty(None);
        cart.apply(CartMutation::Add(line("A", "1kg", 50, u32::MAX))).unwrap();
        let err = cart
            .apply(CartMutation::Add(line("A", "1kg", 50, 1)))
            .unwrap_err();
        assert_eq!(err, CartError::QuantityOverflow(LineKey::new("A", "1kg")));
        assert_eq!(cart.line(&LineKey::new("A", "1kg")).unwrap().quantity, u32::MAX);

        cart.apply(CartMutation::Add(line("A", "500g", 30, 1))).unwrap();
        let err = cart
            .apply(CartMutation::SetQuantity {
                key: LineKey::new("A", "500g"),
                quantity: 1,
                new_rate: Some(RateSelection::new("1kg", Price::from_rupees(50))),
            })
            .unwrap_err();
        assert!(matches!(err, CartError::QuantityOverflow(_)));
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_other_unit_is_second_line() {
        let mut cart = Cart::empty(None);
        cart.apply(CartMutation::Add(line("A", "1kg", 50, 2))).unwrap();
        cart.apply(CartMutation::Add(line("A", "500g", 30, 1))).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(&LineKey::new("A", "1kg")).unwrap().quantity, 2);
        assert_eq!(cart.lines_for(&ProductId::new("A")).count(), 2);
    }

    #[test]
    fn test_quantity_zero_removes_line() {
        let mut cart = Cart::empty(None);
        cart.apply(CartMutation::Add(line("A", "1kg", 50, 1))).unwrap();
        cart.apply(CartMutation::Add(line("A", "500g", 30, 1))).unwrap();
        cart.apply(CartMutation::SetQuantity {
            key: LineKey::new("A", "1kg"),
            quantity: 0,
            new_rate: None,
        })
        .unwrap();
        assert!(cart.line(&LineKey::new("A", "1kg")).is_none());
        assert_eq!(cart.line(&LineKey::new("A", "500g")).unwrap().quantity, 1);
        assert!(cart.lines().iter().all(|l| l.quantity > 0));
    }

    #[test]
    fn test_unit_move_merges_into_existing_line() {
        let mut cart = Cart::empty(None);
        cart.apply(CartMutation::Add(line("A", "1kg", 50, 1))).unwrap();
        cart.apply(CartMutation::Add(line("A", "500g", 30, 2))).unwrap();
        cart.apply(CartMutation::SetQuantity {
            key: LineKey::new("A", "1kg"),
            quantity: 3,
            new_rate: Some(RateSelection::new("500g", Price::from_rupees(30))),
        })
        .unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(&LineKey::new("A", "500g")).unwrap().quantity, 5);
    }

    #[test]
    fn test_unit_move_to_free_unit() {
        let mut cart = Cart::empty(None);
        cart.apply(CartMutation::Add(line("A", "1kg", 50, 1))).unwrap();
        cart.apply(CartMutation::SetQuantity {
            key: LineKey::new("A", "1kg"),
            quantity: 2,
            new_rate: Some(RateSelection::new("2kg", Price::from_rupees(95))),
        })
        .unwrap();
        let l = cart.line(&LineKey::new("A", "2kg")).unwrap();
        assert_eq!(l.quantity, 2);
        assert_eq!(l.subtotal(), Price::from_rupees(190));
    }

    #[test]
    fn test_at_most_one_line_per_key_over_sequence() {
        let mut cart = Cart::empty(None);
        let ops = vec![
            CartMutation::Add(line("A", "1kg", 50, 1)),
            CartMutation::Add(line("A", "500g", 30, 1)),
            CartMutation::Add(line("A", "1kg", 50, 4)),
            CartMutation::SetQuantity {
                key: LineKey::new("A", "500g"),
                quantity: 2,
                new_rate: Some(RateSelection::new("1kg", Price::from_rupees(50))),
            },
            CartMutation::Add(line("A", "500g", 30, 1)),
            CartMutation::Add(line("B", "1kg", 20, 1)),
        ];
        for op in ops {
            cart.apply(op).unwrap();
            assert!(count(&cart, "A", "1kg") <= 1);
            assert!(count(&cart, "A", "500g") <= 1);
        }
        assert_eq!(cart.line(&LineKey::new("A", "1kg")).unwrap().quantity, 7);
    }

    #[test]
    fn test_missing_line_errors() {
        let mut cart = Cart::empty(None);
        let err = cart
            .apply(CartMutation::Remove(LineKey::new("A", "1kg")))
            .unwrap_err();
        assert_eq!(err, CartError::LineNotFound(LineKey::new("A", "1kg")));
    }

    #[test]
    fn test_add_rejects_placeholder_unit_and_zero() {
        let mut cart = Cart::empty(None);
        assert!(matches!(
            cart.apply(CartMutation::Add(line("A", "default", 0, 1))),
            Err(CartError::MissingUnit(_))
        ));
        assert!(matches!(
            cart.apply(CartMutation::Add(line("A", "1kg", 50, 0))),
            Err(CartError::ZeroQuantity(_))
        ));
    }

    #[test]
    fn test_from_parts_rejects_duplicates_and_zero() {
        let dup = Cart::from_parts(
            None,
            vec![line("A", "1kg", 50, 1), line("A", "1kg", 50, 2)],
            CartTotals::default(),
        );
        assert!(matches!(dup, Err(CartError::DuplicateLine(_))));

        let zero = Cart::from_parts(None, vec![line("A", "1kg", 50, 0)], CartTotals::default());
        assert!(matches!(zero, Err(CartError::ZeroQuantity(_))));
    }

    #[test]
    fn test_ownership() {
        let cart = Cart::empty(Some(UserId::new("u1")));
        assert!(cart.is_owned_by(&UserId::new("u1")));
        assert!(!cart.is_owned_by(&UserId::new("u2")));
        assert!(!Cart::empty(None).is_owned_by(&UserId::new("u1")));
    }

    #[test]
    fn test_missing_display_field() {
        let mut d = line("A", "1kg", 1, 1).display;
        assert_eq!(d.first_missing(), None);
        d.image = String::new();
        assert_eq!(d.first_missing(), Some("image"));
    }
}
