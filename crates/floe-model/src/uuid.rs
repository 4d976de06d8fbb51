//! Element addressing.
//!
//! Every addressable element of a (possibly nested) document is identified by
//! a `(graph, state, node, edge)` quadruple with `-1` placeholders for the
//! components that do not apply. The wire form is slash-separated, e.g.
//! `"0/1/3/-1"` for node 3 of state 1 of graph 0.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementUuid {
    pub graph: i64,
    pub state: i64,
    pub node: i64,
    pub edge: i64,
}

impl ElementUuid {
    pub const NONE: i64 = -1;

    pub fn graph(graph: i64) -> Self {
        Self {
            graph,
            state: Self::NONE,
            node: Self::NONE,
            edge: Self::NONE,
        }
    }

    pub fn state(graph: i64, state: i64) -> Self {
        Self {
            graph,
            state,
            node: Self::NONE,
            edge: Self::NONE,
        }
    }

    pub fn node(graph: i64, state: i64, node: i64) -> Self {
        Self {
            graph,
            state,
            node,
            edge: Self::NONE,
        }
    }

    pub fn edge(graph: i64, state: i64, edge: i64) -> Self {
        Self {
            graph,
            state,
            node: Self::NONE,
            edge,
        }
    }

    /// Inter-state edge addressing: state and node components are unused.
    pub fn interstate_edge(graph: i64, edge: i64) -> Self {
        Self {
            graph,
            state: Self::NONE,
            node: Self::NONE,
            edge,
        }
    }

    pub fn is_state(&self) -> bool {
        self.state >= 0 && self.node < 0 && self.edge < 0
    }

    pub fn is_node(&self) -> bool {
        self.node >= 0
    }

    pub fn is_edge(&self) -> bool {
        self.edge >= 0
    }
}

impl fmt::Display for ElementUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.graph, self.state, self.node, self.edge)
    }
}

impl FromStr for ElementUuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidUuid {
            text: s.to_string(),
        };
        let mut parts = s.split('/');
        let mut next = || -> Result<i64> {
            parts
                .next()
                .and_then(|p| p.trim().parse::<i64>().ok())
                .ok_or_else(invalid)
        };
        let uuid = Self {
            graph: next()?,
            state: next()?,
            node: next()?,
            edge: next()?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_slash_form() {
        let uuid = ElementUuid::node(0, 2, 17);
        assert_eq!(uuid.to_string(), "0/2/17/-1");
        assert_eq!("0/2/17/-1".parse::<ElementUuid>().unwrap(), uuid);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("0/1/2".parse::<ElementUuid>().is_err());
        assert!("0/1/2/3/4".parse::<ElementUuid>().is_err());
        assert!("a/b/c/d".parse::<ElementUuid>().is_err());
    }

    #[test]
    fn component_predicates() {
        assert!(ElementUuid::state(0, 1).is_state());
        assert!(!ElementUuid::node(0, 1, 2).is_state());
        assert!(ElementUuid::node(0, 1, 2).is_node());
        assert!(ElementUuid::edge(0, 1, 3).is_edge());
    }
}
