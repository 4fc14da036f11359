//! Build a small generalized Rabin automaton and print it in HOA format.
//!
//! The automaton counts letters with proposition 0 modulo `--modulus`. Its single pair accepts
//! runs that wrap the counter infinitely often while seeing proposition 1 in state 0 only
//! finitely often.
//!
//! Run with:
//! ```bash
//! cargo run --example hoa_dump -- --modulus 3 --props 2
//! ```

use std::fmt;
use std::io;

use clap::Parser;
use log::info;
use omega_automata::automaton::Automaton;
use omega_automata::bdd::BddConfig;
use omega_automata::bitset::BitSet;
use omega_automata::edge::Edge;
use omega_automata::hoa::{Aliases, HoaWriter};
use omega_automata::rabin::{GeneralizedRabinAcceptance, RabinPair};
use omega_automata::state::AutomatonState;
use omega_automata::transition_set::TranSet;
use omega_automata::valuation::ValuationSetFactory;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print a generalized Rabin automaton in HOA format")]
struct Cli {
    /// Counter modulus (number of states)
    #[arg(long, default_value = "3")]
    modulus: u32,

    /// Number of atomic propositions (at least 2)
    #[arg(long, default_value = "2")]
    props: usize,

    /// Unique table size in bits (size = 2^bits)
    #[arg(long)]
    storage_bits: Option<usize>,

    /// Name the propositions `p0`, `p1`, ... through aliases
    #[arg(long)]
    aliases: bool,

    /// Log decision-diagram and exploration details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Counter {
    value: u32,
    modulus: u32,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mod {}", self.value, self.modulus)
    }
}

impl AutomatonState for Counter {
    fn sensitive_alphabet(&self) -> Option<BitSet> {
        Some(BitSet::from([0]))
    }

    fn successor(&self, letter: &BitSet) -> Option<Edge<Self>> {
        let value = if letter.contains(0) {
            (self.value + 1) % self.modulus
        } else {
            self.value
        };
        Some(Edge::of(Counter {
            value,
            modulus: self.modulus,
        }))
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = if cli.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    if cli.modulus == 0 {
        return Err(color_eyre::eyre::eyre!("modulus must be positive"));
    }
    if cli.props < 2 {
        return Err(color_eyre::eyre::eyre!("at least 2 propositions are needed"));
    }

    let factory = match cli.storage_bits {
        Some(bits) => ValuationSetFactory::with_config(cli.props, BddConfig::with_storage_bits(bits)),
        None => ValuationSetFactory::new(cli.props),
    };
    info!("factory = {:?}", factory);

    let last = Counter {
        value: cli.modulus - 1,
        modulus: cli.modulus,
    };
    let first = Counter {
        value: 0,
        modulus: cli.modulus,
    };

    let mut fin = TranSet::new(&factory);
    fin.insert(first.clone(), factory.proposition(1));
    let mut wrap = TranSet::new(&factory);
    wrap.insert(last, factory.proposition(0));

    let acceptance = GeneralizedRabinAcceptance::new(vec![RabinPair::new(fin, vec![wrap])]);
    info!("{}", acceptance);

    let mut automaton = Automaton::new(&factory, acceptance, move || Some(first));
    automaton.generate();
    info!(
        "explored {} states, deterministic: {}",
        automaton.size(),
        automaton.is_deterministic()
    );

    let aliases: Aliases = (0..cli.props).map(|p| (format!("p{}", p), p)).collect();
    let mut writer = HoaWriter::new(io::stdout().lock());
    if cli.aliases {
        writer = writer.with_aliases(&aliases);
    }
    writer.write(&automaton);

    let released = automaton.free();
    info!("released {} labels, {} sets still live", released, factory.live_sets());

    Ok(())
}
