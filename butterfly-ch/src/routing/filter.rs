//! Edge filters applied while walking adjacency lists

use std::fmt;
use std::sync::Arc;

use butterfly_common::{Error, Result};

use crate::flags::{EdgeFlags, Mode};

type Predicate = Arc<dyn Fn(EdgeFlags) -> bool + Send + Sync>;

/// Predicate over base-oriented edge flags
#[derive(Clone)]
pub enum EdgeFilter {
    /// Every edge, including hidden ones
    All,
    /// Edges traversable in the requested direction(s), optionally for one mode
    Access {
        mode: Option<Mode>,
        incoming: bool,
        outgoing: bool,
    },
    /// Edges that are not shortcuts
    Original,
    Custom(Predicate),
    And(Box<EdgeFilter>, Box<EdgeFilter>),
}

static ALL: EdgeFilter = EdgeFilter::All;
static OUTGOING: EdgeFilter = EdgeFilter::Access {
    mode: None,
    incoming: false,
    outgoing: true,
};
static INCOMING: EdgeFilter = EdgeFilter::Access {
    mode: None,
    incoming: true,
    outgoing: false,
};

impl EdgeFilter {
    pub fn all_edges() -> &'static EdgeFilter {
        &ALL
    }

    /// Edges leaving the base node, any mode
    pub fn outgoing() -> &'static EdgeFilter {
        &OUTGOING
    }

    /// Edges entering the base node, any mode
    pub fn incoming() -> &'static EdgeFilter {
        &INCOMING
    }

    /// Direction/mode filter; a filter accepting neither direction is rejected
    pub fn access(mode: Option<Mode>, incoming: bool, outgoing: bool) -> Result<Self> {
        if !incoming && !outgoing {
            return Err(Error::InvalidFilter(
                "filter must accept incoming or outgoing edges".to_string(),
            ));
        }
        Ok(EdgeFilter::Access {
            mode,
            incoming,
            outgoing,
        })
    }

    pub fn custom(predicate: impl Fn(EdgeFlags) -> bool + Send + Sync + 'static) -> Self {
        EdgeFilter::Custom(Arc::new(predicate))
    }

    /// Both filters must accept
    pub fn and(self, other: EdgeFilter) -> Self {
        match (self, other) {
            (EdgeFilter::All, f) | (f, EdgeFilter::All) => f,
            (a, b) => EdgeFilter::And(Box::new(a), Box::new(b)),
        }
    }

    #[inline]
    pub fn accept(&self, flags: EdgeFlags) -> bool {
        match self {
            EdgeFilter::All => true,
            EdgeFilter::Access {
                mode,
                incoming,
                outgoing,
            } => {
                if let Some(mode) = mode {
                    if !flags.has_access(*mode) {
                        return false;
                    }
                }
                (*outgoing && flags.is_forward()) || (*incoming && flags.is_backward())
            }
            EdgeFilter::Original => !flags.is_shortcut(),
            EdgeFilter::Custom(predicate) => predicate(flags),
            EdgeFilter::And(a, b) => a.accept(flags) && b.accept(flags),
        }
    }
}

impl fmt::Debug for EdgeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeFilter::All => f.write_str("All"),
            EdgeFilter::Access {
                mode,
                incoming,
                outgoing,
            } => f
                .debug_struct("Access")
                .field("mode", mode)
                .field("incoming", incoming)
                .field("outgoing", outgoing)
                .finish(),
            EdgeFilter::Original => f.write_str("Original"),
            EdgeFilter::Custom(_) => f.write_str("Custom(..)"),
            EdgeFilter::And(a, b) => f.debug_tuple("And").field(a).field(b).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_membership() {
        let fwd = EdgeFlags::default_flags(false);
        let bwd = fwd.swap_direction();

        assert!(EdgeFilter::outgoing().accept(fwd));
        assert!(!EdgeFilter::incoming().accept(fwd));
        assert!(EdgeFilter::incoming().accept(bwd));
        assert!(!EdgeFilter::outgoing().accept(bwd));

        assert!(EdgeFilter::all_edges().accept(EdgeFlags::HIDDEN));
        assert!(EdgeFilter::Original.accept(fwd));
        assert!(!EdgeFilter::Original.accept(EdgeFlags::shortcut(Mode::Car, true, true)));
        assert!(!EdgeFilter::outgoing().accept(EdgeFlags::HIDDEN));
        assert!(!EdgeFilter::incoming().accept(EdgeFlags::HIDDEN));
    }

    #[test]
    fn test_access_rejects_empty_filter() {
        assert!(matches!(
            EdgeFilter::access(Some(Mode::Car), false, false),
            Err(Error::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_mode_access() {
        let bike_only = EdgeFlags::new(&[Mode::Bike], 20, true, true);
        let car_out = EdgeFilter::access(Some(Mode::Car), false, true).unwrap();
        let bike_out = EdgeFilter::access(Some(Mode::Bike), false, true).unwrap();
        assert!(!car_out.accept(bike_only));
        assert!(bike_out.accept(bike_only));
    }

    #[test]
    fn test_and_composition() {
        let slow = EdgeFlags::new(&[Mode::Car], 20, true, false);
        let fast = EdgeFlags::new(&[Mode::Car], 90, true, false);
        let filter = EdgeFilter::outgoing()
            .clone()
            .and(EdgeFilter::custom(|f| f.speed_kmh() >= 50));
        assert!(filter.accept(fast));
        assert!(!filter.accept(slow));
        assert!(!filter.accept(fast.swap_direction()));

        assert!(matches!(
            EdgeFilter::All.and(EdgeFilter::outgoing().clone()),
            EdgeFilter::Access { .. }
        ));
    }
}
