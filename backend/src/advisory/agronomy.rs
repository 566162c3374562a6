use chrono::{DateTime, Days, NaiveDate, Utc};
use shared::{CropPrice, FarmingCalendar, FertilizerPlan, ForecastDay, PriceTrend, WeatherSnapshot};

use crate::inference::ValidationError;

const TARGET_NITROGEN: f64 = 60.0;
const TARGET_PHOSPHORUS: f64 = 40.0;
const TARGET_POTASSIUM: f64 = 50.0;

// kg of product per kg of nutrient short
const UREA_PER_N: f64 = 2.17;
const DAP_PER_P: f64 = 2.27;
const MOP_PER_K: f64 = 1.67;

pub fn fertilizer_plan(nitrogen: f64, phosphorus: f64, potassium: f64) -> FertilizerPlan {
    let deficit = |target: f64, measured: f64| (target - measured).max(0.0);
    let nitrogen_needed = deficit(TARGET_NITROGEN, nitrogen);
    let phosphorus_needed = deficit(TARGET_PHOSPHORUS, phosphorus);
    let potassium_needed = deficit(TARGET_POTASSIUM, potassium);

    FertilizerPlan {
        nitrogen_needed,
        phosphorus_needed,
        potassium_needed,
        urea_kg_per_acre: nitrogen_needed * UREA_PER_N,
        dap_kg_per_acre: phosphorus_needed * DAP_PER_P,
        mop_kg_per_acre: potassium_needed * MOP_PER_K,
    }
}

pub fn weather_advice(temperature: f64, humidity: f64, rainfall: f64) -> Vec<String> {
    let mut advice = Vec::new();

    if temperature > 35.0 {
        advice.push("High temperature alert: Increase irrigation frequency");
        advice.push("Consider shade nets for sensitive crops");
    } else if temperature < 10.0 {
        advice.push("Cold temperature warning: Protect crops from frost");
        advice.push("Delay transplanting until temperatures rise");
    }

    if humidity > 80.0 {
        advice.push("High humidity: Monitor for fungal diseases");
        advice.push("Ensure good air circulation around plants");
    } else if humidity < 40.0 {
        advice.push("Low humidity: Increase mulching to retain moisture");
    }

    if rainfall > 50.0 {
        advice.push("Heavy rainfall expected: Ensure proper drainage");
        advice.push("Postpone fertilizer application");
    } else if rainfall < 5.0 {
        advice.push("Low rainfall: Plan irrigation accordingly");
        advice.push("Consider drought-resistant crop varieties");
    }

    if advice.is_empty() {
        advice.push("Weather conditions are favorable for normal farming activities");
    }
    advice.into_iter().map(String::from).collect()
}

const DEFAULT_LOCATION: &str = "default";
const MARKET: &str = "Local Mandi";

/// Current conditions and a three-day outlook for `location`. No live weather
/// feed is wired in, so every location gets the same sample reading; the
/// advice is derived from it like any other reading.
pub fn weather_snapshot(location: &str) -> WeatherSnapshot {
    let location = match location.trim() {
        "" => DEFAULT_LOCATION,
        name => name,
    };
    let (temperature, humidity, rainfall) = (25.5, 65.0, 2.5);
    let day = |day: &str, temp_max: f64, temp_min: f64, rain_chance: u8| ForecastDay {
        day: day.to_string(),
        temp_max,
        temp_min,
        rain_chance,
    };

    WeatherSnapshot {
        location: location.to_string(),
        temperature,
        humidity,
        rainfall,
        wind_speed: 8.2,
        weather_condition: "Partly Cloudy".to_string(),
        forecast: vec![
            day("Today", 28.0, 22.0, 30),
            day("Tomorrow", 30.0, 24.0, 10),
            day("Day 3", 27.0, 21.0, 60),
        ],
        agriculture_advice: weather_advice(temperature, humidity, rainfall),
    }
}

/// Reference market prices (INR per kg), stamped with `as_of`.
pub fn crop_prices(as_of: DateTime<Utc>) -> Vec<CropPrice> {
    const PRICES: [(&str, f64, PriceTrend); 8] = [
        ("Rice", 22.50, PriceTrend::Increasing),
        ("Wheat", 20.75, PriceTrend::Stable),
        ("Cotton", 45.00, PriceTrend::Decreasing),
        ("Maize", 18.25, PriceTrend::Increasing),
        ("Tomato", 15.50, PriceTrend::Stable),
        ("Potato", 12.00, PriceTrend::Increasing),
        ("Onion", 25.75, PriceTrend::Decreasing),
        ("Sugarcane", 35.00, PriceTrend::Stable),
    ];

    PRICES
        .iter()
        .map(|&(crop_name, price_per_kg, price_trend)| CropPrice {
            crop_name: crop_name.to_string(),
            price_per_kg,
            market_location: MARKET.to_string(),
            price_trend,
            last_updated: as_of,
        })
        .collect()
}

fn crop_duration_days(crop: &str) -> u64 {
    match crop.trim().to_lowercase().as_str() {
        "rice" => 120,
        "wheat" => 125,
        "cotton" => 180,
        "maize" => 100,
        "tomato" => 90,
        "potato" => 100,
        "onion" => 120,
        _ => 100,
    }
}

/// Key field operations from a `YYYY-MM-DD` planting date.
pub fn farming_calendar(crop: &str, planting_date: &str) -> Result<FarmingCalendar, ValidationError> {
    let planting = NaiveDate::parse_from_str(planting_date.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::Fields(vec![format!(
            "Invalid planting_date {:?}: expected YYYY-MM-DD",
            planting_date
        )])
    })?;
    let duration = crop_duration_days(crop);
    let after = |days: u64| {
        planting.checked_add_days(Days::new(days)).ok_or_else(|| {
            ValidationError::Fields(vec!["planting_date is out of range".to_string()])
        })
    };

    Ok(FarmingCalendar {
        planting_date: planting,
        germination_date: after(7)?,
        first_fertilizer: after(21)?,
        second_fertilizer: after(45)?,
        flowering_stage: after(duration / 2)?,
        harvest_date: after(duration)?,
    })
}
