//! Parse table definitions.
//!
//! Actions are packed into one `i64` word per table cell:
//!
//! * `word >= 0` shifts and moves to state `word`,
//! * `SPECIAL_CASE_TAG < word < 0` reduces by production `-(word + 1)`,
//! * `ACCEPT < word <= SPECIAL_CASE_TAG` resolves through the special-case
//!   table entry `SPECIAL_CASE_TAG - word`,
//! * `ACCEPT` and `ERROR` are what they say.

/// The action word that finishes a parse.
pub const ACCEPT: i64 = -0x7fff_ffff_ffff_ffff;

/// The action word of an empty table cell.
pub const ERROR: i64 = ACCEPT - 1;

/// The first action word referring to the special-case table.
pub const SPECIAL_CASE_TAG: i64 = -0x4000_0000_0000_0000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction {
    Shift(usize),
    Reduce(usize),
    Accept,
    /// Index into the special-case table of a dynamic parser.
    SpecialCase(usize),
    Error,
}

impl ParseAction {
    pub fn decode(word: i64) -> Self {
        if word >= 0 {
            Self::Shift(word as usize)
        } else if word > SPECIAL_CASE_TAG {
            Self::Reduce((-(word + 1)) as usize)
        } else if word == ACCEPT {
            Self::Accept
        } else if word == ERROR {
            Self::Error
        } else {
            Self::SpecialCase((SPECIAL_CASE_TAG - word) as usize)
        }
    }

    pub fn encode(self) -> i64 {
        match self {
            Self::Shift(state) => state as i64,
            Self::Reduce(prod) => -(prod as i64) - 1,
            Self::Accept => ACCEPT,
            Self::SpecialCase(index) => SPECIAL_CASE_TAG - index as i64,
            Self::Error => ERROR,
        }
    }
}

/// The flat tables of a statically dispatched parser.
///
/// `action_table` has `state_count * action_width` words and `goto_table`
/// `state_count * goto_width` entries, both row-major by state.
#[derive(Debug)]
pub struct ParserTables<'a> {
    pub state_count: usize,
    pub action_table: &'a [i64],
    pub action_width: usize,
    pub goto_table: &'a [usize],
    pub goto_width: usize,
    /// The terminal index of the end of input.
    pub end_terminal: usize,
    /// The terminal index of `ErrorToken`, if any state can recover.
    pub error_terminal: Option<usize>,
}

impl ParserTables<'_> {
    pub fn action(&self, state: usize, terminal: usize) -> ParseAction {
        debug_assert!(terminal < self.action_width);
        self.action_table
            .get(state * self.action_width + terminal)
            .map_or(ParseAction::Error, |word| ParseAction::decode(*word))
    }

    /// The state after reducing to `nonterminal` in `state`. Entries out of
    /// the state range mark a missing goto.
    pub fn goto(&self, state: usize, nonterminal: usize) -> Option<usize> {
        debug_assert!(nonterminal < self.goto_width);
        self.goto_table
            .get(state * self.goto_width + nonterminal)
            .copied()
            .filter(|next| *next < self.state_count)
    }

    /// Whether the table sizes agree with the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.action_table.len() == self.state_count * self.action_width
            && self.goto_table.len() == self.state_count * self.goto_width
            && self.end_terminal < self.action_width
            && self.error_terminal.map_or(true, |t| t < self.action_width)
    }
}
