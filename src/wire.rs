use serde::{Deserialize, Serialize};

/// One suggestion entry from the city search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub display: String,
}

/// Body of `GET /api/search-cities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySearchResponse {
    pub cities: Vec<CityRecord>,
}

/// Body of `POST /api/register`. Field values are sent verbatim; the server
/// owns all validation, including the password/confirmation match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub username: String,
    pub nickname: String,
    pub password: String,
    pub confirm_password: String,
}
