use indexmap::IndexMap;
use lipochem::AtomicDatabase;
use tracing::debug;

use crate::{FragmentRegistry, FragmentRule, Result, RulesError};

impl<'a> FragmentRegistry<'a> {
    #[must_use]
    pub fn new(db: &'a AtomicDatabase) -> Self {
        Self {
            db,
            head: IndexMap::new(),
            chains: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn db(&self) -> &'a AtomicDatabase {
        self.db
    }

    /// Appends a head group fragment, which must not refer to any chain
    ///
    /// # Errors
    ///
    /// Fails if the name is already taken, or if the fragment refers to a chain
    pub fn push_head(&mut self, rule: FragmentRule<'a>) -> Result<()> {
        if rule.chain().is_some() {
            return Err(Box::new(RulesError::HeadFragmentWithChain(rule.name().to_owned())));
        }
        self.check_unique(rule.name())?;
        debug!(name = rule.name(), formula = rule.formula(), "registered head group fragment");
        self.head.insert(rule.name().to_owned(), rule);
        Ok(())
    }

    /// Appends a chain fragment, which must add or remove exactly one chain
    ///
    /// # Errors
    ///
    /// Fails if the name is already taken, or if the fragment doesn't refer to a chain
    pub fn push_chain(&mut self, rule: FragmentRule<'a>) -> Result<()> {
        if rule.chain().is_none() {
            return Err(Box::new(RulesError::ChainFragmentWithoutChain(rule.name().to_owned())));
        }
        self.check_unique(rule.name())?;
        debug!(name = rule.name(), formula = rule.formula(), "registered chain fragment");
        self.chains.insert(rule.name().to_owned(), rule);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FragmentRule<'a>> {
        self.head.get(name).or_else(|| self.chains.get(name))
    }

    #[must_use]
    pub fn is_chain_fragment(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    pub fn head_fragments(&self) -> impl Iterator<Item = &FragmentRule<'a>> {
        self.head.values()
    }

    pub fn chain_fragments(&self) -> impl Iterator<Item = &FragmentRule<'a>> {
        self.chains.values()
    }

    /// Every fragment name, longest first, so that no name can be matched inside of a longer one
    ///
    /// Names of equal length keep the order they were defined in.
    #[must_use]
    pub fn names_longest_first(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.head.keys().chain(self.chains.keys()).map(String::as_str).collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));
        names
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        if self.get(name).is_some() {
            return Err(Box::new(RulesError::DuplicateFragment(name.to_owned())));
        }
        Ok(())
    }
}
