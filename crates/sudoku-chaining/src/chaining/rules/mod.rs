//! Chaining rules: pluggable strong/weak link derivation per link type.
//!
//! Each rule scans one pattern family and inserts links into the shared
//! dictionaries; loop searches later hand the pattern tags back to the
//! owning rule for extra eliminations. Rules are resolved once into a
//! fixed registry; there is no per-call strategy lookup.

mod als;
mod elementary;
mod fish;
mod locked;
pub(crate) mod rectangle;
mod wing;

use std::collections::HashMap;

use log::debug;

use super::fabric::Fabric;
use super::link::{LinkDictionary, LinkPattern};
use super::step::Conclusion;

pub use als::AlmostLockedSetsRule;
pub use elementary::{SameCellRule, SameDigitRule};
pub use fish::FishRule;
pub use locked::LockedCandidatesRule;
pub use rectangle::{AvoidableRectangleRule, UniqueRectangleRule};
pub use wing::XyzWingRule;

/// Closed set of link types a rule can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkType {
    SameDigit,
    SameCell,
    LockedCandidates,
    AlmostLockedSets,
    Fish,
    KrakenFish,
    UniqueRectangleSameDigit,
    UniqueRectangleDifferentDigit,
    AvoidableRectangle,
    XyzWing,
}

impl LinkType {
    pub const ALL: [LinkType; 10] = [
        LinkType::SameDigit,
        LinkType::SameCell,
        LinkType::LockedCandidates,
        LinkType::AlmostLockedSets,
        LinkType::Fish,
        LinkType::KrakenFish,
        LinkType::UniqueRectangleSameDigit,
        LinkType::UniqueRectangleDifferentDigit,
        LinkType::AvoidableRectangle,
        LinkType::XyzWing,
    ];

    /// Elementary links are always built; the rest are "advanced" and only
    /// built when the caller permits them.
    pub fn is_elementary(self) -> bool {
        matches!(self, LinkType::SameDigit | LinkType::SameCell)
    }
}

/// How widely a rule may spread its grouped links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDensity {
    /// Only groups confined to a box/line intersection.
    Intersection,
    /// Also grouped-to-grouped links within a full house.
    House,
    /// Also links from grouped nodes to outside singleton candidates.
    Unrestricted,
}

/// Per-link-type configuration.
#[derive(Debug, Clone)]
pub struct LinkOption {
    pub enabled: bool,
    pub density: LinkDensity,
    /// Pattern size cap where it applies (ALS cell count, fish base size).
    pub max_pattern_size: usize,
}

impl LinkOption {
    fn default_for(ty: LinkType) -> Self {
        LinkOption {
            enabled: true,
            density: LinkDensity::House,
            max_pattern_size: match ty {
                LinkType::AlmostLockedSets => 4,
                LinkType::Fish | LinkType::KrakenFish => 2,
                _ => 0,
            },
        }
    }
}

/// Configuration for every link type. A disabled or misconfigured rule
/// degrades to "no links produced", never an error.
#[derive(Debug, Clone)]
pub struct ChainingOptions {
    options: HashMap<LinkType, LinkOption>,
}

impl Default for ChainingOptions {
    fn default() -> Self {
        ChainingOptions {
            options: LinkType::ALL
                .iter()
                .map(|&ty| (ty, LinkOption::default_for(ty)))
                .collect(),
        }
    }
}

impl ChainingOptions {
    pub fn get(&self, ty: LinkType) -> &LinkOption {
        &self.options[&ty]
    }

    pub fn disable(&mut self, ty: LinkType) -> &mut Self {
        if let Some(opt) = self.options.get_mut(&ty) {
            opt.enabled = false;
        }
        self
    }

    pub fn set_density(&mut self, ty: LinkType, density: LinkDensity) -> &mut Self {
        if let Some(opt) = self.options.get_mut(&ty) {
            opt.density = density;
        }
        self
    }

    pub fn set_max_pattern_size(&mut self, ty: LinkType, size: usize) -> &mut Self {
        if let Some(opt) = self.options.get_mut(&ty) {
            opt.max_pattern_size = size;
        }
        self
    }

    pub fn is_enabled(&self, ty: LinkType) -> bool {
        self.options[&ty].enabled
    }
}

/// A link-derivation strategy for one or more link types.
pub trait ChainingRule {
    /// The link types this rule owns.
    fn link_types(&self) -> &'static [LinkType];

    /// Scan the grid and insert strong/weak links. Must produce nothing
    /// (and not fail) when its types are disabled or no pattern matches.
    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions);

    /// Extra eliminations implied by this rule's patterns when they close a
    /// loop or a blossom branch set. Must be idempotent over `patterns`.
    fn loop_conclusions(
        &self,
        _fab: &Fabric,
        _patterns: &[&LinkPattern],
        _out: &mut Vec<Conclusion>,
    ) {
    }
}

/// Fixed table of rule implementations, resolved once per engine.
pub struct RuleRegistry {
    rules: Vec<Box<dyn ChainingRule>>,
    options: ChainingOptions,
}

impl RuleRegistry {
    /// Resolve the closed registry: every link type maps to its strategy
    /// here, at construction time.
    pub fn resolve(options: ChainingOptions) -> Self {
        let rules: Vec<Box<dyn ChainingRule>> = vec![
            Box::new(SameDigitRule),
            Box::new(SameCellRule),
            Box::new(LockedCandidatesRule),
            Box::new(AlmostLockedSetsRule),
            Box::new(FishRule),
            Box::new(UniqueRectangleRule),
            Box::new(AvoidableRectangleRule),
            Box::new(XyzWingRule),
        ];
        RuleRegistry { rules, options }
    }

    pub fn options(&self) -> &ChainingOptions {
        &self.options
    }

    /// Build the strong/weak dictionaries for one snapshot. Elementary
    /// rules always run; advanced rules only when permitted.
    pub fn build_dictionary(&self, fab: &Fabric, allow_advanced: bool) -> LinkDictionary {
        let mut dict = LinkDictionary::new();
        for rule in &self.rules {
            let types = rule.link_types();
            let advanced = types.iter().any(|t| !t.is_elementary());
            if advanced && !allow_advanced {
                continue;
            }
            if types.iter().all(|&t| !self.options.is_enabled(t)) {
                continue;
            }
            rule.get_links(fab, &mut dict, &self.options);
        }
        dict.seal();
        debug!(
            "link dictionary built: {} strong, {} weak entries (advanced: {})",
            dict.strong_len(),
            dict.weak_len(),
            allow_advanced
        );
        dict
    }

    /// Pattern-derived eliminations for a closed loop or blossom branch
    /// set: hand each pattern tag back to its owning rule. Output is
    /// sorted and deduplicated, so repeated calls agree.
    pub fn loop_conclusions(&self, fab: &Fabric, patterns: &[&LinkPattern]) -> Vec<Conclusion> {
        let mut out = Vec::new();
        for rule in &self.rules {
            let owned: Vec<&LinkPattern> = patterns
                .iter()
                .copied()
                .filter(|p| rule.link_types().contains(&p.link_type()))
                .collect();
            if !owned.is_empty() {
                rule.loop_conclusions(fab, &owned, &mut out);
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}
