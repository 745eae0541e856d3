use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct ClubConfigRow {
    pub club_id: String,
    pub config: String,
    pub updated_at: i64,
}

/// The per-club JSON blob merged into the prompt template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClubConfigData {
    #[serde(default)]
    pub club_name: String,
    #[serde(default)]
    pub club_description: String,
    #[serde(default)]
    pub club_rules: String,
    #[serde(default)]
    pub club_context: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClubConfigData {
    pub fn default_for(club_id: &str) -> Self {
        ClubConfigData {
            club_name: format!("{} Golfklubb", club_id),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClubConfig {
    pub club_id: String,
    pub config: ClubConfigData,
    pub updated_at: i64,
}

impl TryFrom<ClubConfigRow> for ClubConfig {
    type Error = serde_json::Error;

    fn try_from(row: ClubConfigRow) -> Result<Self, Self::Error> {
        Ok(ClubConfig {
            config: serde_json::from_str(&row.config)?,
            club_id: row.club_id,
            updated_at: row.updated_at,
        })
    }
}

/// Admin form for creating or replacing a club's configuration.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddClubForm {
    #[validate(length(min = 1, max = 100))]
    pub club_id: String,
    pub club_name: Option<String>,
    pub club_description: Option<String>,
    pub club_rules: Option<String>,
    pub club_context: Option<String>,
}

impl AddClubForm {
    pub fn into_data(self) -> (String, ClubConfigData) {
        let data = ClubConfigData {
            club_name: self
                .club_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Golfklubb".to_string()),
            club_description: self.club_description.unwrap_or_default(),
            club_rules: self.club_rules.unwrap_or_default(),
            club_context: self.club_context.unwrap_or_default(),
            extra: Map::new(),
        };
        (self.club_id, data)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClubPromptForm {
    #[validate(length(min = 1))]
    pub prompt: String,
}
