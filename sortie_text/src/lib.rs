// sortie_text: reader for the simulator's curly-brace block grammar.
//
// Turns block text such as
//
//     Block
//     {
//       Name = "Hangar";
//       Model = "graphics\blocks\arf_hangars_1.mgm";
//       XPos = 1200.5;
//     }
//
// into items of a `sortie_mission::Mission`. Read path only; there is no
// writer for the text form.
//
// Module overview:
// - `lexer.rs`:  Three regex token rules (block open, property, block close),
//                comment skipping, and line tracking.
// - `parser.rs`: Stack-based `Parser` building items, value classification,
//                `Damaged` block folding.
// - `error.rs`:  `ParseError`, every input-related variant with a line number.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use parser::Parser;

use sortie_mission::{Mission, MissionConfig};

/// Parse `src` into a fresh mission whose roots are the top-level blocks.
pub fn parse_str(src: &str) -> Result<Mission, ParseError> {
    parse_str_with(src, &MissionConfig::default())
}

/// Like `parse_str`, with the mission's index seed taken from `config`.
pub fn parse_str_with(src: &str, config: &MissionConfig) -> Result<Mission, ParseError> {
    let mut mission = Mission::with_config(config);
    Parser::new(&mut mission).parse_into(src)?;
    Ok(mission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortie_mission::{Assembler, ItemKind, PropKey, Value};

    #[test]
    fn parse_str_roots() {
        let mission = parse_str("MCU_Timer { Time = 5; }\nMCU_Counter { Counter = 2; }").unwrap();
        assert_eq!(mission.roots().len(), 2);
        assert_eq!(mission[mission.roots()[1]].kind(), &ItemKind::Counter);
        assert_eq!(
            mission[mission.roots()[1]].get(&PropKey::Counter),
            Some(&Value::Num(2.0))
        );
    }

    #[test]
    fn parsed_tree_assembles() {
        let mut mission = parse_str("Block { Name = \"Shed\"; }").unwrap();
        let bytes = Assembler::default().assemble(&mut mission).unwrap();
        // Block, then a 4-entry string table of width 4, then an empty damage table.
        assert_eq!(bytes.len(), 81 + (4 + 2 + 4 * 2 + 4 * 4) + 6);
    }

    #[test]
    fn seed_from_config() {
        let config = MissionConfig {
            index_seed: 50,
            ..MissionConfig::default()
        };
        let mut mission = parse_str_with("Block { }", &config).unwrap();
        let root = mission.roots()[0];
        assert_eq!(mission.reference_index(root).unwrap().0, 50);
    }
}
