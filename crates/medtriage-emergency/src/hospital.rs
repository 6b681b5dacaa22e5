//! Safe stand-in for a live hospital lookup

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyNumbers {
    pub primary: String,
    pub alternatives: Vec<String>,
}

/// Directions to find care without inventing hospital data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalLookup {
    pub status: &'static str,
    pub message: &'static str,
    pub action: &'static str,
    pub search_query: String,
    pub emergency_numbers: EmergencyNumbers,
    pub instructions: Vec<String>,
    pub fallback_url: String,
}

/// No hospital data source is wired in, so every lookup takes this path
pub fn hospital_fallback(lat: f64, lon: f64, emergency_number: &str) -> HospitalLookup {
    HospitalLookup {
        status: "fallback",
        message: "Real-time hospital data unavailable. Using emergency services.",
        action: "redirect_to_maps",
        search_query: format!("emergency room near {},{}", lat, lon),
        emergency_numbers: EmergencyNumbers {
            primary: emergency_number.to_string(),
            alternatives: vec!["108".to_string(), "102".to_string()],
        },
        instructions: vec![
            format!("Call {} immediately for ambulance", emergency_number),
            "Open the map link to find the nearest emergency room".to_string(),
            "Do NOT wait for AI assistance in life-threatening situations".to_string(),
        ],
        fallback_url: format!(
            "https://www.google.com/maps/search/emergency+room+near+me/@{},{},14z",
            lat, lon
        ),
    }
}
