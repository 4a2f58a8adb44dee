//! Response group: which optional sub-graphs of an order to load.

use std::convert::Infallible;
use std::str::FromStr;

use bitflags::bitflags;

bitflags! {
    /// Set of optional sub-graphs requested for an order read.
    ///
    /// Discounts and tax details of the root are not part of the set; they
    /// are always loaded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResponseGroup: u32 {
        const WITH_ADDRESSES = 1 << 0;
        const WITH_IN_PAYMENTS = 1 << 1;
        const WITH_ITEMS = 1 << 2;
        const WITH_SHIPMENTS = 1 << 3;
        const WITH_DYNAMIC_PROPERTIES = 1 << 4;
        const WITH_PRICES = 1 << 5;

        const FULL = Self::WITH_ADDRESSES.bits()
            | Self::WITH_IN_PAYMENTS.bits()
            | Self::WITH_ITEMS.bits()
            | Self::WITH_SHIPMENTS.bits()
            | Self::WITH_DYNAMIC_PROPERTIES.bits()
            | Self::WITH_PRICES.bits();
    }
}

const NAMED: [(&str, ResponseGroup); 6] = [
    ("WithAddresses", ResponseGroup::WITH_ADDRESSES),
    ("WithInPayments", ResponseGroup::WITH_IN_PAYMENTS),
    ("WithItems", ResponseGroup::WITH_ITEMS),
    ("WithShipments", ResponseGroup::WITH_SHIPMENTS),
    ("WithDynamicProperties", ResponseGroup::WITH_DYNAMIC_PROPERTIES),
    ("WithPrices", ResponseGroup::WITH_PRICES),
];

impl ResponseGroup {
    /// Decodes an untrusted response-group string.
    ///
    /// Never fails. Missing, blank or entirely unrecognized input yields
    /// [`ResponseGroup::FULL`]; unknown tokens next to known ones are
    /// ignored. `None` and `0` are understood as an explicit empty group.
    /// Numeric tokens drop unknown bits and count as unrecognized when no
    /// known bit is left.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::FULL;
        };

        let mut group = Self::empty();
        let mut recognized = false;
        for token in raw
            .split(|c: char| matches!(c, ',' | '|' | ';') || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            if let Some(flags) = Self::parse_token(token) {
                group |= flags;
                recognized = true;
            }
        }

        if recognized { group } else { Self::FULL }
    }

    fn parse_token(token: &str) -> Option<Self> {
        if let Ok(bits) = token.parse::<u32>() {
            // Only `0` may decode to nothing; all-unknown bits are garbage.
            let flags = Self::from_bits_truncate(bits);
            return (bits == 0 || !flags.is_empty()).then_some(flags);
        }

        let normalized = normalize(token);
        match normalized.as_str() {
            "full" => return Some(Self::FULL),
            "none" => return Some(Self::empty()),
            _ => {}
        }
        NAMED
            .iter()
            .find(|(name, _)| normalize(name) == normalized)
            .map(|(_, flags)| *flags)
    }

    /// Returns true when dynamic property values should be eagerly loaded
    /// together with their owning sub-graphs.
    pub fn loads_dynamic_properties(&self) -> bool {
        self.contains(Self::WITH_DYNAMIC_PROPERTIES)
    }

    /// Returns true when loaded aggregates keep their prices.
    pub fn keeps_prices(&self) -> bool {
        self.contains(Self::WITH_PRICES)
    }
}

fn normalize(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Default for ResponseGroup {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for ResponseGroup {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::decode(Some(s)))
    }
}

impl std::fmt::Display for ResponseGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::FULL {
            return f.write_str("Full");
        }
        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = NAMED
            .iter()
            .filter(|(_, flags)| self.contains(*flags))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_is_union_of_all_options() {
        let union = NAMED
            .iter()
            .fold(ResponseGroup::empty(), |acc, (_, flags)| acc | *flags);
        assert_eq!(union, ResponseGroup::FULL);
        assert_eq!(ResponseGroup::all(), ResponseGroup::FULL);
    }

    #[test]
    fn missing_blank_and_garbled_input_defaults_to_full() {
        assert_eq!(ResponseGroup::decode(None), ResponseGroup::FULL);
        assert_eq!(ResponseGroup::decode(Some("")), ResponseGroup::FULL);
        assert_eq!(ResponseGroup::decode(Some("   ")), ResponseGroup::FULL);
        assert_eq!(
            ResponseGroup::decode(Some("not-a-real-flag")),
            ResponseGroup::FULL
        );
        assert_eq!(ResponseGroup::decode(Some(",,;|")), ResponseGroup::FULL);
    }

    #[test]
    fn combines_named_tokens() {
        let group = ResponseGroup::decode(Some("WithItems, WithShipments"));
        assert_eq!(
            group,
            ResponseGroup::WITH_ITEMS | ResponseGroup::WITH_SHIPMENTS
        );
        assert!(!group.keeps_prices());
    }

    #[test]
    fn token_matching_ignores_case_and_separators() {
        let group = ResponseGroup::decode(Some("with_items|WITH-PRICES;withaddresses"));
        assert_eq!(
            group,
            ResponseGroup::WITH_ITEMS | ResponseGroup::WITH_PRICES | ResponseGroup::WITH_ADDRESSES
        );
    }

    #[test]
    fn unknown_tokens_are_ignored_next_to_known_ones() {
        let group = ResponseGroup::decode(Some("WithItems,Bogus"));
        assert_eq!(group, ResponseGroup::WITH_ITEMS);
    }

    #[test]
    fn numeric_tokens_truncate_unknown_bits() {
        let group = ResponseGroup::decode(Some("4"));
        assert_eq!(group, ResponseGroup::WITH_ITEMS);

        let group = ResponseGroup::decode(Some("68"));
        assert_eq!(group, ResponseGroup::WITH_ITEMS);
    }

    #[test]
    fn numeric_tokens_without_known_bits_fall_back_to_full() {
        assert_eq!(ResponseGroup::decode(Some("64")), ResponseGroup::FULL);
        assert_eq!(ResponseGroup::decode(Some("1024")), ResponseGroup::FULL);
        assert_eq!(
            ResponseGroup::decode(Some("64,WithAddresses")),
            ResponseGroup::WITH_ADDRESSES
        );
    }

    #[test]
    fn explicit_none_decodes_to_empty_group() {
        assert!(ResponseGroup::decode(Some("None")).is_empty());
        assert!(ResponseGroup::decode(Some("0")).is_empty());
    }

    #[test]
    fn display_lists_option_names() {
        assert_eq!(ResponseGroup::FULL.to_string(), "Full");
        assert_eq!(ResponseGroup::empty().to_string(), "None");
        assert_eq!(
            (ResponseGroup::WITH_ITEMS | ResponseGroup::WITH_SHIPMENTS).to_string(),
            "WithItems, WithShipments"
        );
    }

    #[test]
    fn display_output_decodes_back() {
        let group = ResponseGroup::WITH_IN_PAYMENTS | ResponseGroup::WITH_DYNAMIC_PROPERTIES;
        let parsed: ResponseGroup = group.to_string().parse().unwrap();
        assert_eq!(parsed, group);
    }
}
