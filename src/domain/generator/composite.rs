//! Ordered composite: the first member with an opinion wins.

use super::PriceStrategy;
use crate::domain::signal::Intent;

pub struct Composite {
    members: Vec<Box<dyn PriceStrategy>>,
}

impl Composite {
    pub fn new(members: Vec<Box<dyn PriceStrategy>>) -> Self {
        Composite { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl PriceStrategy for Composite {
    /// Short-circuits: members after the first one to fire do not see
    /// this price.
    fn on_new_price(&mut self, price: f64) -> Option<Intent> {
        self.members
            .iter_mut()
            .find_map(|member| member.on_new_price(price))
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.members.iter().map(|m| m.describe()).collect();
        format!("ANY[{}]", names.join(", "))
    }
}
