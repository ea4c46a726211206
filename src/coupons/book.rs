//! Coupon Book
//!
//! The authoritative store for coupon definitions. One book holds both
//! order-scoped and item-scoped coupons, which is what makes code
//! uniqueness across the two kinds a single-index query, and it owns the
//! stacking allow-list between them.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::coupons::{
    Coupon, CouponKey,
    draft::{CouponDraft, DefinitionErrors},
};

/// Store of validated coupons plus the stacking allow-list.
#[derive(Debug, Default)]
pub struct CouponBook<'a> {
    coupons: SlotMap<CouponKey, Coupon<'a>>,
    codes: FxHashMap<String, CouponKey>,

    // Directed pairs: (a, b) present means "a may stack with b".
    stacking: FxHashSet<(CouponKey, CouponKey)>,
}

impl<'a> CouponBook<'a> {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coupons: SlotMap::with_key(),
            codes: FxHashMap::default(),
            stacking: FxHashSet::default(),
        }
    }

    /// Validate a draft and add the resulting coupon to the book.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionErrors`] listing every definition rule the draft
    /// violates, including a code collision with a coupon of either kind.
    pub fn insert(&mut self, draft: CouponDraft<'a>) -> Result<CouponKey, DefinitionErrors> {
        let coupon = draft.validate(self)?;
        let code = coupon.code().to_string();
        let key = self.coupons.insert(coupon);

        self.codes.insert(code, key);

        Ok(key)
    }

    /// Look up a coupon by key.
    pub fn get(&self, key: CouponKey) -> Option<&Coupon<'a>> {
        self.coupons.get(key)
    }

    /// Look up a coupon by key, mutably.
    pub fn get_mut(&mut self, key: CouponKey) -> Option<&mut Coupon<'a>> {
        self.coupons.get_mut(key)
    }

    /// Look up a coupon by code.
    pub fn by_code(&self, code: &str) -> Option<(CouponKey, &Coupon<'a>)> {
        let key = *self.codes.get(code)?;
        let coupon = self.coupons.get(key)?;

        Some((key, coupon))
    }

    /// Whether any coupon of either kind already uses this code.
    #[must_use]
    pub fn contains_code(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    /// Number of coupons in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    /// Iterate over all coupons.
    pub fn iter(&self) -> impl Iterator<Item = (CouponKey, &Coupon<'a>)> {
        self.coupons.iter()
    }

    /// Declare that `a` may stack with `b`, in that direction only.
    pub fn allow_stacking(&mut self, a: CouponKey, b: CouponKey) {
        self.stacking.insert((a, b));
    }

    /// Declare that `a` and `b` may stack, in both directions.
    pub fn allow_mutual_stacking(&mut self, a: CouponKey, b: CouponKey) {
        self.stacking.insert((a, b));
        self.stacking.insert((b, a));
    }

    /// Whether `a` declares that it may stack with `b`.
    ///
    /// This is a pure directed lookup: neither symmetry nor transitivity is
    /// inferred, so callers combining two coupons should query both
    /// orderings (or declare relations with
    /// [`allow_mutual_stacking`](Self::allow_mutual_stacking)).
    #[must_use]
    pub fn stacks_with(&self, a: CouponKey, b: CouponKey) -> bool {
        self.stacking.contains(&(a, b))
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::coupons::draft::DefinitionError;

    use super::*;

    fn amount_draft(code: &str) -> CouponDraft<'static> {
        let mut draft = CouponDraft::order(code, code);
        draft.amount = Some(Money::from_minor(100, GBP));

        draft
    }

    #[test]
    fn insert_indexes_the_code() -> TestResult {
        let mut book = CouponBook::new();
        let key = book.insert(amount_draft("SPRING"))?;

        assert!(book.contains_code("SPRING"));
        assert_eq!(book.len(), 1);

        let (found_key, coupon) = book.by_code("SPRING").expect("coupon not found");

        assert_eq!(found_key, key);
        assert_eq!(coupon.code(), "SPRING");

        Ok(())
    }

    #[test]
    fn duplicate_code_across_kinds_is_rejected() -> TestResult {
        let mut book = CouponBook::new();

        book.insert(amount_draft("SHARED"))?;

        let mut item_draft = CouponDraft::item("SHARED", "Item Twin");
        item_draft.percent = Some(Percentage::from(0.1));

        let Err(errors) = book.insert(item_draft) else {
            panic!("expected duplicate code rejection");
        };

        assert!(errors.contains(&DefinitionError::DuplicateCode("SHARED".to_string())));
        assert_eq!(book.len(), 1);

        Ok(())
    }

    #[test]
    fn rejected_draft_leaves_book_unchanged() {
        let mut book = CouponBook::new();

        let result = book.insert(CouponDraft::order("NOBENEFIT", "No Benefit"));

        assert!(result.is_err());
        assert!(book.is_empty());
        assert!(!book.contains_code("NOBENEFIT"));
    }

    #[test]
    fn stacking_is_directed() -> TestResult {
        let mut book = CouponBook::new();
        let a = book.insert(amount_draft("A"))?;
        let b = book.insert(amount_draft("B"))?;

        assert!(!book.stacks_with(a, b));
        assert!(!book.stacks_with(b, a));

        book.allow_stacking(a, b);

        assert!(book.stacks_with(a, b));
        assert!(!book.stacks_with(b, a));

        Ok(())
    }

    #[test]
    fn mutual_stacking_declares_both_directions() -> TestResult {
        let mut book = CouponBook::new();
        let a = book.insert(amount_draft("A"))?;
        let b = book.insert(amount_draft("B"))?;

        book.allow_mutual_stacking(a, b);

        assert!(book.stacks_with(a, b));
        assert!(book.stacks_with(b, a));

        Ok(())
    }

    #[test]
    fn get_mut_allows_in_place_mutation() -> TestResult {
        let mut book = CouponBook::new();

        let mut draft = amount_draft("LIMITED");
        draft.remaining_uses = Some(3);

        let key = book.insert(draft)?;

        let coupon = book.get_mut(key).expect("coupon not found");
        let _ = coupon.take_use();

        let coupon = book.get(key).expect("coupon not found");

        assert_eq!(coupon.terms().remaining_uses(), Some(2));

        Ok(())
    }

    #[test]
    fn iter_walks_every_coupon() -> TestResult {
        let mut book = CouponBook::new();

        book.insert(amount_draft("A"))?;
        book.insert(amount_draft("B"))?;

        let mut codes: Vec<&str> = book.iter().map(|(_, coupon)| coupon.code()).collect();
        codes.sort_unstable();

        assert_eq!(codes, vec!["A", "B"]);

        Ok(())
    }
}
