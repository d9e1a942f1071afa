use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 5;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Scared,
    Worried,
    Calm,
    Excited,
    Tired,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Scared,
        Emotion::Worried,
        Emotion::Calm,
        Emotion::Excited,
        Emotion::Tired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Scared => "scared",
            Emotion::Worried => "worried",
            Emotion::Calm => "calm",
            Emotion::Excited => "excited",
            Emotion::Tired => "tired",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Emotion {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Emotion::ALL
            .iter()
            .copied()
            .find(|emotion| emotion.as_str() == value)
            .ok_or_else(|| format!("unsupported emotion: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub id: String,
    pub user_id: String,
    pub emotion: Emotion,
    pub description: String,
    pub intensity: u8,
    pub occurred_at: DateTime<FixedOffset>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiaryEntryRequest {
    pub user_id: String,
    pub emotion: Emotion,
    pub description: String,
    pub intensity: u8,
    pub occurred_at: DateTime<FixedOffset>,
}

impl CreateDiaryEntryRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::validation("user id is required"));
        }
        validate_description(&self.description)?;
        validate_intensity(self.intensity)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionCount {
    pub emotion: Emotion,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStep {
    SelectEmotion,
    Describe,
    SetIntensity,
    Ready,
}

/// The three-step entry wizard: pick an emotion, describe it, rate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryDraft {
    user_id: String,
    emotion: Option<Emotion>,
    description: Option<String>,
    intensity: Option<u8>,
}

impl DiaryDraft {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            emotion: None,
            description: None,
            intensity: None,
        }
    }

    pub fn step(&self) -> DraftStep {
        match (&self.emotion, &self.description, &self.intensity) {
            (None, _, _) => DraftStep::SelectEmotion,
            (Some(_), None, _) => DraftStep::Describe,
            (Some(_), Some(_), None) => DraftStep::SetIntensity,
            (Some(_), Some(_), Some(_)) => DraftStep::Ready,
        }
    }

    /// Picking a different emotion restarts the later steps.
    pub fn select_emotion(&mut self, emotion: Emotion) {
        if self.emotion != Some(emotion) {
            self.description = None;
            self.intensity = None;
        }
        self.emotion = Some(emotion);
    }

    pub fn describe(&mut self, description: impl Into<String>) -> AppResult<()> {
        if self.emotion.is_none() {
            return Err(AppError::validation("select an emotion first"));
        }
        let description = description.into();
        validate_description(&description)?;
        self.description = Some(description.trim().to_string());
        Ok(())
    }

    pub fn set_intensity(&mut self, intensity: u8) -> AppResult<()> {
        if self.description.is_none() {
            return Err(AppError::validation("describe the feeling first"));
        }
        validate_intensity(intensity)?;
        self.intensity = Some(intensity);
        Ok(())
    }

    /// Go back one step, dropping the answer given there.
    pub fn back(&mut self) {
        if self.intensity.take().is_some() {
            return;
        }
        if self.description.take().is_some() {
            return;
        }
        self.emotion = None;
    }

    pub fn finish(self, occurred_at: DateTime<FixedOffset>) -> AppResult<CreateDiaryEntryRequest> {
        match (self.emotion, self.description, self.intensity) {
            (Some(emotion), Some(description), Some(intensity)) => Ok(CreateDiaryEntryRequest {
                user_id: self.user_id,
                emotion,
                description,
                intensity,
                occurred_at,
            }),
            _ => Err(AppError::validation("diary entry is incomplete")),
        }
    }
}

fn validate_description(description: &str) -> AppResult<()> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("description must not be empty"));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_intensity(intensity: u8) -> AppResult<()> {
    if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        return Err(AppError::validation(format!(
            "intensity must be between {MIN_INTENSITY} and {MAX_INTENSITY}"
        )));
    }
    Ok(())
}
