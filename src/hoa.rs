//! Export to the [HOA format](https://adl.github.io/hoaf/).
//!
//! States are numbered by first visit during one export. Each symbolic edge is split by the
//! acceptance condition into pieces that carry a fixed set of marks; empty pieces are skipped.
//! Output failures are logged and do not interrupt the export.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::io::{self, Write};

use indexmap::IndexMap;
use log::warn;

use crate::acceptance::{NoneAcceptance, OmegaAcceptance};
use crate::automaton::Automaton;
use crate::bitset::BitSet;
use crate::expr::AtomLabel;
use crate::state::AutomatonState;

/// Bidirectional mapping between proposition names and indices.
#[derive(Debug, Default, Clone)]
pub struct Aliases {
    by_name: IndexMap<String, usize>,
    by_index: HashMap<usize, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `index`, replacing any binding of either.
    pub fn insert(&mut self, name: impl Into<String>, index: usize) {
        let name = name.into();
        if let Some(old_index) = self.by_name.shift_remove(&name) {
            self.by_index.remove(&old_index);
        }
        if let Some(old_name) = self.by_index.insert(index, name.clone()) {
            self.by_name.shift_remove(&old_name);
        }
        self.by_name.insert(name, index);
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_name.iter().map(|(name, &index)| (name.as_str(), index))
    }

    fn atom(&self, index: usize) -> AtomLabel {
        match self.name(index) {
            Some(name) => AtomLabel::Alias(name.to_string()),
            None => AtomLabel::Ap(index),
        }
    }
}

impl<N: Into<String>> FromIterator<(N, usize)> for Aliases {
    fn from_iter<I: IntoIterator<Item = (N, usize)>>(iter: I) -> Self {
        let mut aliases = Aliases::new();
        for (name, index) in iter {
            aliases.insert(name, index);
        }
        aliases
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn marks(acceptance: &BitSet) -> String {
    let ids: Vec<String> = acceptance.iter().map(|i| i.to_string()).collect();
    format!("{{{}}}", ids.join(" "))
}

/// State numbering of one export pass.
struct StateIds<S> {
    ids: HashMap<S, usize>,
}

impl<S: Clone + Eq + Hash> StateIds<S> {
    fn id(&mut self, state: &S) -> usize {
        if let Some(&id) = self.ids.get(state) {
            return id;
        }
        let id = self.ids.len();
        self.ids.insert(state.clone(), id);
        id
    }
}

pub struct HoaWriter<'a, W> {
    out: W,
    tool: String,
    version: Option<String>,
    name: Option<String>,
    aliases: Option<&'a Aliases>,
}

impl<'a, W: Write> HoaWriter<'a, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            name: None,
            aliases: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>, version: Option<&str>) -> Self {
        self.tool = tool.into();
        self.version = version.map(str::to_string);
        self
    }

    /// Automaton name; defaults to `Automaton for <initial state>`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_aliases(mut self, aliases: &'a Aliases) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.try_line(args) {
            warn!("HOA output failed: {}", e);
        }
    }

    fn try_line(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.out.write_fmt(args)?;
        self.out.write_all(b"\n")
    }

    fn header_acceptance<S>(&mut self, acceptance: &dyn OmegaAcceptance<S>) {
        let mut name = acceptance.name();
        for extra in acceptance.name_extra() {
            name.push_str(&format!(" {}", extra));
        }
        self.line(format_args!("acc-name: {}", name));
        // The expression must be built before any edge is split.
        let condition = acceptance.boolean_expression();
        self.line(format_args!(
            "Acceptance: {} {}",
            acceptance.acceptance_sets(),
            condition
        ));
    }

    /// Write `automaton` as one HOA document.
    ///
    /// Only explored states are written. An automaton without initial state, or without
    /// explored states, is written with an empty body.
    pub fn write<S, A>(&mut self, automaton: &Automaton<S, A>)
    where
        S: AutomatonState + fmt::Display,
        A: OmegaAcceptance<S>,
    {
        let mut ids = StateIds { ids: HashMap::new() };
        let initial = automaton.resolved_initial_state();
        let size = automaton.size();
        let acceptance = automaton.acceptance();
        let alphabet_size = automaton.factory().alphabet_size();

        self.line(format_args!("HOA: v1"));
        let tool = match &self.version {
            Some(version) => format!("{} {}", quoted(&self.tool), quoted(version)),
            None => quoted(&self.tool),
        };
        self.line(format_args!("tool: {}", tool));
        let name = match (&self.name, initial) {
            (Some(name), _) => name.clone(),
            (None, Some(initial)) => format!("Automaton for {}", initial),
            (None, None) => "false".to_string(),
        };
        self.line(format_args!("name: {}", quoted(&name)));
        self.line(format_args!("States: {}", size));

        let start = initial.filter(|_| size > 0);
        match start {
            Some(initial) => {
                let id = ids.id(initial);
                self.line(format_args!("Start: {}", id));
                self.header_acceptance(acceptance);
            }
            None => self.header_acceptance::<S>(&NoneAcceptance),
        }

        let names: Vec<String> = (0..alphabet_size)
            .map(|p| match self.aliases.and_then(|a| a.name(p)) {
                Some(name) => quoted(name),
                None => quoted(&p.to_string()),
            })
            .collect();
        if names.is_empty() {
            self.line(format_args!("AP: 0"));
        } else {
            self.line(format_args!("AP: {} {}", alphabet_size, names.join(" ")));
        }
        if let Some(aliases) = self.aliases {
            for (alias, index) in aliases.iter() {
                self.line(format_args!("Alias: @{} {}", alias, index));
            }
        }
        for (key, values) in acceptance.misc_annotations() {
            if values.is_empty() {
                self.line(format_args!("{}:", key));
            } else {
                self.line(format_args!("{}: {}", key, values.join(" ")));
            }
        }
        self.line(format_args!("--BODY--"));

        if start.is_none() {
            self.line(format_args!("--END--"));
            return;
        }

        let aliases = self.aliases;
        let atom = |p: usize| match aliases {
            Some(aliases) => aliases.atom(p),
            None => AtomLabel::Ap(p),
        };

        for state in automaton.states() {
            let id = ids.id(state);
            self.line(format_args!("State: {} {}", id, quoted(&state.to_string())));

            let Some(row) = automaton.row(state) else {
                continue;
            };
            for (edge, label) in row {
                let successor = edge.successor();
                if !automaton.is_explored(successor) {
                    warn!("HOA: edge from {} leads to unexplored state {}", state, successor);
                }
                for (piece, acc) in acceptance.split_edge(state, edge, label) {
                    if piece.is_empty() {
                        continue;
                    }
                    let target = ids.id(successor);
                    let expr = piece.to_expression_with(&atom);
                    if acc.is_empty() {
                        self.line(format_args!("[{}] {}", expr, target));
                    } else {
                        self.line(format_args!("[{}] {} {}", expr, target, marks(&acc)));
                    }
                }
            }
        }

        self.line(format_args!("--END--"));
        if let Err(e) = self.out.flush() {
            warn!("HOA output failed: {}", e);
        }
    }
}

impl<S, A> Automaton<S, A>
where
    S: AutomatonState + fmt::Display,
    A: OmegaAcceptance<S>,
{
    /// The automaton as a HOA document, with default header values.
    pub fn to_hoa(&self, aliases: Option<&Aliases>) -> String {
        let mut writer = HoaWriter::new(Vec::new());
        if let Some(aliases) = aliases {
            writer = writer.with_aliases(aliases);
        }
        writer.write(self);
        String::from_utf8_lossy(&writer.into_inner()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::acceptance::BuchiAcceptance;
    use crate::edge::Edge;
    use crate::valuation::ValuationSetFactory;

    #[derive(Debug, Clone, Eq, PartialEq, Hash)]
    enum Light {
        Off,
        On,
    }

    impl fmt::Display for Light {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl AutomatonState for Light {
        fn successor(&self, letter: &BitSet) -> Option<Edge<Self>> {
            if letter.contains(0) {
                Some(Edge::marked(Light::On, 0))
            } else {
                Some(Edge::of(Light::Off))
            }
        }
    }

    fn write<S, A>(automaton: &Automaton<S, A>, aliases: Option<&Aliases>) -> String
    where
        S: AutomatonState + fmt::Display,
        A: OmegaAcceptance<S>,
    {
        let mut writer = HoaWriter::new(Vec::new()).with_tool("test", Some("1.0"));
        if let Some(aliases) = aliases {
            writer = writer.with_aliases(aliases);
        }
        writer.write(automaton);
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_buchi_automaton() {
        let factory = ValuationSetFactory::new(1);
        let mut automaton = Automaton::with_initial_state(&factory, BuchiAcceptance, Some(Light::Off));
        automaton.generate();

        let expected = "\
HOA: v1
tool: \"test\" \"1.0\"
name: \"Automaton for Off\"
States: 2
Start: 0
acc-name: Buchi
Acceptance: 1 Inf(0)
AP: 1 \"0\"
--BODY--
State: 0 \"Off\"
[!0] 0
[0] 1 {0}
State: 1 \"On\"
[!0] 0
[0] 1 {0}
--END--
";
        assert_eq!(write(&automaton, None), expected);
    }

    #[test]
    fn test_empty_automaton() {
        let factory = ValuationSetFactory::new(1);
        let automaton = Automaton::<Light, _>::empty(&factory, BuchiAcceptance);

        let expected = "\
HOA: v1
tool: \"test\" \"1.0\"
name: \"false\"
States: 0
acc-name: none
Acceptance: 0 f
AP: 1 \"0\"
--BODY--
--END--
";
        assert_eq!(write(&automaton, None), expected);
    }

    #[test]
    fn test_unexplored_automaton_has_empty_body() {
        let factory = ValuationSetFactory::new(1);
        let automaton = Automaton::with_initial_state(&factory, BuchiAcceptance, Some(Light::On));

        let hoa = write(&automaton, None);
        assert!(hoa.contains("name: \"Automaton for On\"\n"));
        assert!(!hoa.contains("Start:"));
        assert!(hoa.contains("acc-name: none\n"));
        assert!(hoa.ends_with("--BODY--\n--END--\n"));
    }

    #[test]
    fn test_aliases() {
        let factory = ValuationSetFactory::new(1);
        let mut automaton = Automaton::with_initial_state(&factory, BuchiAcceptance, Some(Light::Off));
        automaton.generate();

        let aliases: Aliases = [("req", 0)].into_iter().collect();
        let hoa = write(&automaton, Some(&aliases));
        assert!(hoa.contains("AP: 1 \"req\"\nAlias: @req 0\n"));
        assert!(hoa.contains("[!@req] 0\n[@req] 1 {0}\n"));
    }

    #[test]
    fn test_default_tool_and_name() {
        let factory = ValuationSetFactory::new(1);
        let mut automaton = Automaton::with_initial_state(&factory, BuchiAcceptance, Some(Light::Off));
        automaton.generate();

        let hoa = automaton.to_hoa(None);
        let tool = format!(
            "tool: \"{}\" \"{}\"\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        assert!(hoa.contains(&tool));

        let mut writer = HoaWriter::new(Vec::new()).with_name("say \"hi\"");
        writer.write(&automaton);
        let hoa = String::from_utf8(writer.into_inner()).unwrap();
        assert!(hoa.contains("name: \"say \\\"hi\\\"\"\n"));
    }

    #[test]
    fn test_aliases_are_bidirectional() {
        let mut aliases = Aliases::new();
        aliases.insert("a", 0);
        aliases.insert("b", 1);
        aliases.insert("a", 2);
        assert_eq!(aliases.index("a"), Some(2));
        assert_eq!(aliases.name(0), None);
        aliases.insert("c", 1);
        assert_eq!(aliases.index("b"), None);
        assert_eq!(aliases.name(1), Some("c"));
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_output_errors_are_not_fatal() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken pipe"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let factory = ValuationSetFactory::new(1);
        let mut automaton = Automaton::with_initial_state(&factory, BuchiAcceptance, Some(Light::Off));
        automaton.generate();
        HoaWriter::new(Broken).write(&automaton);
    }
}
