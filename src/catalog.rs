use std::fs;

use tracing::{info, warn};

use crate::config::PromptConfig;
use crate::error::ChatError;
use crate::protocol::ConversationTurn;

pub const SENTINEL: &str = "Currently we do not have combinations for that.";

const DIRECTIVE: &str = "You have one task: when the user asks for combinations with a specific item, provide the relevant options. If no combination is available, respond with \"Currently we do not have combinations for that.\"";

const GREETING: &str =
    "Hello! Do you have any clothing items you would like me to provide combinations for?\n";
const MATCHED_QUERY: &str = "black shorts\n";
const MATCHED_ANSWER: &str =
    "Black shorts match with:\n* Red Vineyard Vines Shirt\n* White Graphic Tee\n* Blue Polo\n";
const UNMATCHED_QUERY: &str = "brown hoodie";
const UNMATCHED_ANSWER: &str = "Currently, we do not have combinations for that.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub garment: &'static str,
    pub matches: &'static [&'static str],
}

const BUILTIN: &[CatalogEntry] = &[
    CatalogEntry {
        garment: "Black Shorts",
        matches: &[
            "White graphic tee",
            "Blue V-neck shirt",
            "Black Vans sneakers",
            "Gray baseball cap",
            "Leather bracelet",
        ],
    },
    CatalogEntry {
        garment: "White T-Shirt",
        matches: &[
            "Light blue jeans",
            "Gray zip-up hoodie",
            "Black Converse sneakers",
            "Navy baseball cap",
            "Silver chain necklace",
        ],
    },
    CatalogEntry {
        garment: "Denim Jacket",
        matches: &[
            "Black ripped jeans",
            "White crew neck tee",
            "Brown Chelsea boots",
            "Black sunglasses",
            "Leather belt",
        ],
    },
    CatalogEntry {
        garment: "Khaki Chinos",
        matches: &[
            "Olive green button-down shirt",
            "Brown leather loafers",
            "Black belt",
            "White crew socks",
            "Aviator sunglasses",
        ],
    },
    CatalogEntry {
        garment: "Gray Hoodie",
        matches: &[
            "Black leggings",
            "White high-top sneakers",
            "Burgundy beanie",
            "Silver hoop earrings",
            "Mini backpack",
        ],
    },
    CatalogEntry {
        garment: "Blue Jeans",
        matches: &[
            "Striped long-sleeve shirt",
            "Black ankle boots",
            "Leather crossbody bag",
            "Gold watch",
            "Black belt",
        ],
    },
    CatalogEntry {
        garment: "Black Skirt",
        matches: &[
            "White blouse",
            "Black flats",
            "Pearl necklace",
            "Black clutch",
            "Rose gold bracelet",
        ],
    },
    CatalogEntry {
        garment: "Navy Joggers",
        matches: &[
            "White hoodie",
            "Gray sneakers",
            "Black beanie",
            "Leather strap watch",
            "Silver chain",
        ],
    },
    CatalogEntry {
        garment: "White Denim Shorts",
        matches: &[
            "Light pink crop top",
            "Tan sandals",
            "Straw hat",
            "Gold hoop earrings",
            "Beige crossbody bag",
        ],
    },
    CatalogEntry {
        garment: "Brown Cargo Pants",
        matches: &[
            "Red graphic tee",
            "Beige slip-ons",
            "Black cap",
            "Chain bracelet",
            "Black wristwatch",
        ],
    },
    CatalogEntry {
        garment: "Gray Sweatpants",
        matches: &[
            "Black tank top",
            "White sneakers",
            "Black baseball cap",
            "Silver pendant necklace",
            "Small backpack",
        ],
    },
    CatalogEntry {
        garment: "Green Cargo Shorts",
        matches: &[
            "Beige T-shirt",
            "Brown sandals",
            "Canvas tote bag",
            "Beaded bracelet",
            "Sunglasses",
        ],
    },
    CatalogEntry {
        garment: "Beige Cardigan",
        matches: &[
            "White tank top",
            "Light blue jeans",
            "Tan flats",
            "Gold necklace",
            "Straw tote bag",
        ],
    },
    CatalogEntry {
        garment: "Black Turtleneck",
        matches: &[
            "Camel coat",
            "Black skinny jeans",
            "Ankle boots",
            "Gold hoop earrings",
            "Crossbody satchel",
        ],
    },
    CatalogEntry {
        garment: "White Button-Up Shirt",
        matches: &[
            "Navy chinos",
            "Brown loafers",
            "Leather belt",
            "Silver wristwatch",
            "Black aviators",
        ],
    },
    CatalogEntry {
        garment: "Denim Skirt",
        matches: &[
            "Floral blouse",
            "White sneakers",
            "Pearl earrings",
            "Woven belt",
            "Straw sunhat",
        ],
    },
    CatalogEntry {
        garment: "Black Joggers",
        matches: &[
            "Graphic crewneck sweatshirt",
            "Gray sneakers",
            "Black cap",
            "Leather wristwatch",
            "Crossbody bag",
        ],
    },
    CatalogEntry {
        garment: "Olive Green T-Shirt",
        matches: &[
            "Dark wash jeans",
            "Black Converse sneakers",
            "Black cap",
            "Aviator sunglasses",
            "Leather bracelet",
        ],
    },
    CatalogEntry {
        garment: "Red Flannel Shirt",
        matches: &[
            "White tee",
            "Black jeans",
            "Brown boots",
            "Silver watch",
            "Black belt",
        ],
    },
    CatalogEntry {
        garment: "Camel Overcoat",
        matches: &[
            "Black turtleneck",
            "Gray trousers",
            "Black loafers",
            "Leather gloves",
            "Silver cufflinks",
        ],
    },
];

#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    entries: &'static [CatalogEntry],
}

impl Catalog {
    pub fn builtin() -> Self {
        Self { entries: BUILTIN }
    }

    pub fn entries(&self) -> &'static [CatalogEntry] {
        self.entries
    }

    pub fn lookup(&self, garment: &str) -> Option<&'static CatalogEntry> {
        let wanted = garment.trim();
        self.entries
            .iter()
            .find(|entry| entry.garment.eq_ignore_ascii_case(wanted))
    }

    pub fn render_data(&self) -> String {
        let mut rendered = String::from("This is your data:\n");
        for entry in self.entries {
            rendered.push_str("- ");
            rendered.push_str(entry.garment);
            rendered.push_str(":\n");
            for item in entry.matches {
                rendered.push_str("    • ");
                rendered.push_str(item);
                rendered.push('\n');
            }
        }
        rendered
    }
}

pub fn instruction_block(catalog: &Catalog) -> String {
    format!("{}\n{DIRECTIVE}", catalog.render_data())
}

/// Few-shot history prepended to every conversation. Turn order is part of
/// the contract with the model.
pub fn seed_history(catalog: &Catalog) -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::user(instruction_block(catalog)),
        ConversationTurn::model(GREETING),
        ConversationTurn::user(MATCHED_QUERY),
        ConversationTurn::model(MATCHED_ANSWER),
        ConversationTurn::user(UNMATCHED_QUERY),
        ConversationTurn::model(UNMATCHED_ANSWER),
    ]
}

/// Reads the instruction source used as the upstream system instruction.
/// A missing or empty file degrades to `None` unless the config requires it.
pub fn load_system_instruction(config: &PromptConfig) -> Result<Option<String>, ChatError> {
    let path = &config.instructions_path;
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            info!(path = %path.display(), bytes = text.len(), "loaded system instructions");
            Ok(Some(text))
        }
        Ok(_) if config.require_instructions => Err(ChatError::Configuration(format!(
            "system instructions at {} are empty",
            path.display()
        ))),
        Ok(_) => {
            warn!(path = %path.display(), "system instructions file is empty, continuing without");
            Ok(None)
        }
        Err(error) if config.require_instructions => Err(ChatError::Configuration(format!(
            "failed to read system instructions {}: {error}",
            path.display()
        ))),
        Err(error) => {
            warn!(
                path = %path.display(),
                "failed to read system instructions, continuing without: {error}"
            );
            Ok(None)
        }
    }
}
