//! Traveller profile record and the writable field allow-list

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Durable per-identity preferences, independent of session lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub age: Option<String>,
    pub companions: Option<String>,
    pub travel_style: Option<String>,
    pub food_type: Option<String>,
    /// Comma separated interest tags
    pub interests: Option<String>,
}

impl Profile {
    /// Interest tags as an ordered list, blanks dropped
    pub fn interest_list(&self) -> Vec<String> {
        self.interests
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// True when no field has been set yet
    pub fn is_empty(&self) -> bool {
        ProfileField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Name => &self.name,
            ProfileField::Age => &self.age,
            ProfileField::Companions => &self.companions,
            ProfileField::TravelStyle => &self.travel_style,
            ProfileField::FoodType => &self.food_type,
            ProfileField::Interests => &self.interests,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// Columns of the profiles table that callers may write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Name,
    Age,
    Companions,
    TravelStyle,
    FoodType,
    Interests,
}

impl ProfileField {
    pub const ALL: [ProfileField; 6] = [
        ProfileField::Name,
        ProfileField::Age,
        ProfileField::Companions,
        ProfileField::TravelStyle,
        ProfileField::FoodType,
        ProfileField::Interests,
    ];

    /// Column name in the profiles table
    pub fn column(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Age => "age",
            ProfileField::Companions => "companions",
            ProfileField::TravelStyle => "travel_style",
            ProfileField::FoodType => "food_type",
            ProfileField::Interests => "interests",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for ProfileField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .into_iter()
            .find(|f| f.column() == s)
            .ok_or_else(|| StoreError::InvalidField(s.to_string()))
    }
}
