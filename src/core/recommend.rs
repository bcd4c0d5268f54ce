//! Token-gated personalization: user picks, genre selection and
//! recommendations grouped by genre.

use crate::adapters::http::KopisClient;
use crate::domain::model::Performance;
use crate::utils::error::{Result, ScoutError};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const MAX_SELECTED_GENRES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreGroup {
    pub genre: String,
    pub performances: Vec<Performance>,
}

/// Groups by `genrenm`, keeping the order in which genres first appear.
pub fn group_by_genre(performances: Vec<Performance>) -> Vec<GenreGroup> {
    let mut groups: Vec<GenreGroup> = Vec::new();
    for performance in performances {
        match groups.iter_mut().find(|g| g.genre == performance.genrenm) {
            Some(group) => group.performances.push(performance),
            None => groups.push(GenreGroup {
                genre: performance.genrenm.clone(),
                performances: vec![performance],
            }),
        }
    }
    groups
}

/// Recommendation payload: either a `{genre: [performance]}` object (document
/// order kept) or a flat array that gets grouped by genre.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GenreGroups(pub Vec<GenreGroup>);

impl GenreGroups {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|g| g.performances.is_empty())
    }

    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|g| g.genre.as_str())
    }
}

impl<'de> Deserialize<'de> for GenreGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = GenreGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of genre to performances or a list of performances")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((genre, performances)) = map.next_entry::<String, Vec<Performance>>()? {
                    groups.push(GenreGroup { genre, performances });
                }
                Ok(GenreGroups(groups))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
                let mut performances = Vec::new();
                while let Some(performance) = seq.next_element::<Performance>()? {
                    performances.push(performance);
                }
                Ok(GenreGroups(group_by_genre(performances)))
            }
        }

        deserializer.deserialize_any(GroupsVisitor)
    }
}

/// Genres the user is choosing; capped at three, complete at exactly three.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreSelection {
    genres: Vec<String>,
}

impl GenreSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a genre. Returns whether it is selected afterwards; selecting a
    /// fourth genre is ignored.
    pub fn toggle(&mut self, genre: &str) -> bool {
        if let Some(index) = self.genres.iter().position(|g| g == genre) {
            self.genres.remove(index);
            return false;
        }
        if self.genres.len() >= MAX_SELECTED_GENRES {
            return false;
        }
        self.genres.push(genre.to_string());
        true
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn is_complete(&self) -> bool {
        self.genres.len() == MAX_SELECTED_GENRES
    }
}

/// Personalization token carried explicitly between calls.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    token: Option<String>,
}

impl AuthSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn require_token(&self) -> Result<&str> {
        self.token().ok_or_else(|| ScoutError::AuthError {
            message: "no personalization token; call ensure_token first".to_string(),
        })
    }

    /// Reuse the existing token or issue a new one via `POST /token`.
    pub async fn ensure_token(&mut self, client: &KopisClient) -> Result<&str> {
        if self.token.is_none() {
            let token = client.issue_token().await?;
            tracing::info!("🔑 Issued a new personalization token");
            self.token = Some(token);
        }
        self.require_token()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recommendation {
    /// No picks saved yet; offer popular performances by genre to choose from.
    NeedsSelection { popular: Vec<GenreGroup> },
    Ready(GenreGroups),
}

pub struct RecommendationService<'a> {
    client: &'a KopisClient,
}

impl<'a> RecommendationService<'a> {
    pub fn new(client: &'a KopisClient) -> Self {
        Self { client }
    }

    pub async fn recommend(&self, session: &mut AuthSession) -> Result<Recommendation> {
        let token = session.ensure_token(self.client).await?.to_string();

        let picks = match self.client.user_picks(&token).await {
            Ok(picks) => picks,
            Err(e) => {
                // 取不到 picks 時比照沒有 picks，請使用者重新選擇
                tracing::warn!("⚠️ Could not load user picks: {}", e);
                Vec::new()
            }
        };

        if picks.is_empty() {
            tracing::info!("No saved picks, offering genre selection");
            return self.selection_choices().await;
        }

        tracing::debug!("User has {} saved picks", picks.len());
        let recommended = self.client.recommended_shows(&token).await?;
        Ok(Recommendation::Ready(recommended))
    }

    async fn selection_choices(&self) -> Result<Recommendation> {
        let popular = self.client.popular_by_genre().await?;
        Ok(Recommendation::NeedsSelection {
            popular: group_by_genre(popular),
        })
    }

    /// Save a complete selection, then fetch the recommendations it unlocks.
    pub async fn save_selection(
        &self,
        session: &AuthSession,
        selection: &GenreSelection,
    ) -> Result<GenreGroups> {
        if !selection.is_complete() {
            return Err(ScoutError::ValidationError {
                message: format!(
                    "select exactly {} genres (got {})",
                    MAX_SELECTED_GENRES,
                    selection.genres().len()
                ),
            });
        }
        let token = session.require_token()?;

        self.client.save_user_picks(token, selection.genres()).await?;
        tracing::info!("💾 Saved genre picks: {}", selection.genres().join(", "));
        self.client.recommended_shows(token).await
    }
}
