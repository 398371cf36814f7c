//! Google Maps Platform adapter.
//!
//! Wraps three upstream services behind one [`Adapter`]: the Places API v1
//! (`places:searchNearby`, `places:searchText`, place details), the Routes
//! API v2 (`computeRoutes` and `computeRouteMatrix`), and the classic
//! Geocoding API. All three authenticate with the `GOOGLE_MAPS_API_KEY` key,
//! sent as `X-Goog-Api-Key` (Places/Routes) or the `key` query parameter
//! (Geocoding).
//!
//! Free-text locations that already look like `"lat,lon"` coordinates are
//! parsed directly and never geocoded. Nearby search fans out sequentially:
//! geocode the center, one search per requested place type, one route-matrix
//! call per type for drive distances, then sort each type's results by
//! distance with unreachable places last.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use concierge_core::error::{AdapterError, Result};
use concierge_core::format;
use concierge_core::http::{BATCH_TIMEOUT_SECS, Envelope, RestClient};
use concierge_core::params::ParamReader;
use concierge_core::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition,
};

const PLACES_API_BASE_URL: &str = "https://places.googleapis.com/v1";
const ROUTES_API_BASE_URL: &str = "https://routes.googleapis.com";
const GEOCODING_API_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode";
const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

const METERS_PER_MILE: f64 = 1609.34;
const METERS_TO_MILES: f64 = 0.000_621_371;
const EARTH_RADIUS_MILES: f64 = 3959.0;
const MAX_MATRIX_COMBINATIONS: usize = 100;

const TRAVEL_MODES: &[&str] = &["DRIVE", "WALK", "BICYCLE", "TRANSIT", "TWO_WHEELER"];

const NEARBY_FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.rating,\
                                 places.userRatingCount,places.location,places.id,\
                                 places.nationalPhoneNumber,places.currentOpeningHours";
const TEXT_FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.rating,\
                               places.userRatingCount,places.id,places.types,\
                               places.nationalPhoneNumber,places.websiteUri,places.location";
const ROUTE_FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.polyline,\
                                routes.legs.steps,routes.legs.localizedValues,\
                                routes.legs.distanceMeters,routes.legs.duration,\
                                routes.legs.staticDuration";
const MATRIX_FIELD_MASK: &str = "originIndex,destinationIndex,distanceMeters,duration,status,condition";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

pub struct PlacesAdapter {
    id: String,
    places: RestClient,
    routes: RestClient,
    geocoding: RestClient,
}

impl PlacesAdapter {
    pub fn new() -> Self {
        Self {
            id: "google_places".to_string(),
            places: RestClient::new(PLACES_API_BASE_URL, None, Envelope::Raw),
            routes: RestClient::new(ROUTES_API_BASE_URL, None, Envelope::Raw),
            geocoding: RestClient::new(GEOCODING_API_BASE_URL, None, Envelope::Raw),
        }
    }

    fn api_key(&self) -> Result<String> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AdapterError::Config(format!(
                "{API_KEY_ENV} environment variable not set"
            ))),
        }
    }

    /// Resolve a free-text location to coordinates.
    ///
    /// `"lat,lon"` strings within valid ranges short-circuit; everything else
    /// goes through the Geocoding API.
    async fn resolve_location(&self, location: &str) -> Result<Option<Coordinates>> {
        if let Some(coords) = parse_coordinates(location) {
            debug!(%location, "location parsed as raw coordinates");
            return Ok(Some(coords));
        }
        let key = self.api_key()?;
        let data = self
            .geocoding
            .get("json", &[("address", location.to_string()), ("key", key)])
            .await?;
        Ok(first_geocode_coords(&data))
    }

    async fn places_post(&self, path: &str, field_mask: &str, body: &Value) -> Result<Value> {
        let key = self.api_key()?;
        let builder = self
            .places
            .request(reqwest::Method::POST, path)?
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", field_mask)
            .json(body);
        self.places.send(builder).await
    }

    async fn route_matrix(&self, body: &Value) -> Result<Vec<Value>> {
        let key = self.api_key()?;
        let builder = self
            .routes
            .request(reqwest::Method::POST, "distanceMatrix/v2:computeRouteMatrix")?
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", MATRIX_FIELD_MASK)
            .json(body);
        // The Routes API streams the matrix as JSON Lines.
        let text = self.routes.send_text(builder, BATCH_TIMEOUT_SECS).await?;
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim().trim_matches(|c| c == '[' || c == ']' || c == ',');
            if line.is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str(line) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Place search
    // -----------------------------------------------------------------------

    async fn tool_nearby_search(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let location = reader.required_str_bounded("location", 3, 500);
        let place_types = reader.required_str_list("place_types", 1, 10);
        let radius_miles = reader.float_in_range("radius_miles", 10.0, 0.1, 50.0);
        let max_results = reader.int_in_range("max_results", 20, 1, 20);
        let response_format = reader.response_format();
        reader.finish("google_places_nearby_search")?;
        let location = location.unwrap_or_default();
        let place_types = place_types.unwrap_or_default();

        let Some(center) = self.resolve_location(&location).await? else {
            return Ok(format!(
                "Error: Could not geocode location '{location}'. Please provide a valid address or coordinates."
            ));
        };
        let radius_meters = radius_miles * METERS_PER_MILE;

        let mut results_by_type: Vec<(String, Vec<Value>)> = Vec::new();
        let mut total_count = 0;
        for place_type in &place_types {
            let body = json!({
                "includedTypes": [place_type],
                "maxResultCount": max_results,
                "locationRestriction": {
                    "circle": {
                        "center": {
                            "latitude": center.latitude,
                            "longitude": center.longitude
                        },
                        "radius": radius_meters
                    }
                }
            });
            let data = self.places_post("places:searchNearby", NEARBY_FIELD_MASK, &body).await?;
            let places = data.get("places").and_then(Value::as_array).cloned().unwrap_or_default();

            let mut entries: Vec<Value> = places
                .iter()
                .map(|place| nearby_place_entry(place, center))
                .collect();

            // One matrix call per type for drive distance and time.
            let destinations: Vec<Value> = places
                .iter()
                .filter_map(place_coords)
                .map(|c| {
                    json!({"waypoint": {"location": {"latLng": {
                        "latitude": c.latitude, "longitude": c.longitude
                    }}}})
                })
                .collect();
            if !destinations.is_empty() {
                let matrix_body = json!({
                    "origins": [{"waypoint": {"location": {"latLng": {
                        "latitude": center.latitude, "longitude": center.longitude
                    }}}}],
                    "destinations": destinations,
                    "travelMode": "DRIVE"
                });
                if let Ok(matrix) = self.route_matrix(&matrix_body).await {
                    apply_drive_metrics(&mut entries, &matrix);
                }
            }

            sort_by_distance(&mut entries);
            total_count += entries.len();
            results_by_type.push((place_type.clone(), entries));
        }

        let report = if response_format.is_json() {
            let mut by_type = serde_json::Map::new();
            for (place_type, entries) in &results_by_type {
                by_type.insert(place_type.clone(), json!(entries));
            }
            serde_json::to_string_pretty(&json!({
                "search_location": location,
                "search_coordinates": {
                    "latitude": center.latitude,
                    "longitude": center.longitude
                },
                "radius_miles": radius_miles,
                "results_by_type": by_type,
                "total_results": total_count
            }))?
        } else {
            let mut lines = vec![
                format!("# Nearby Places: {location}"),
                format!("Search radius: {radius_miles} miles"),
                format!("Total results: {total_count}"),
                String::new(),
            ];
            for (place_type, entries) in &results_by_type {
                let type_title = title_case(place_type);
                if entries.is_empty() {
                    lines.push(format!("## {type_title} (0 results)"));
                    lines.push("No places found of this type.".to_string());
                    lines.push(String::new());
                    continue;
                }
                lines.push(format!("## {type_title} ({} results)", entries.len()));
                lines.push(String::new());
                for entry in entries {
                    let rating = match entry.get("rating").and_then(Value::as_f64) {
                        Some(r) => format!("⭐ {r}"),
                        None => "No rating".to_string(),
                    };
                    lines.push(format!("### {} {rating}", str_field(entry, "name")));
                    lines.push(format!("- **Address**: {}", str_field(entry, "address")));
                    if let Some(distance) = entry.get("distance_miles").and_then(Value::as_f64) {
                        lines.push(format!("- **Distance**: {distance} miles"));
                    }
                    if let Some(minutes) = entry.get("drive_time_minutes").and_then(Value::as_f64) {
                        lines.push(format!("- **Drive Time**: {minutes} minutes"));
                    }
                    if let Some(phone) = entry.get("phone").and_then(Value::as_str) {
                        lines.push(format!("- **Phone**: {phone}"));
                    }
                    if let Some(open) = entry.get("open_now").and_then(Value::as_bool) {
                        lines.push(format!(
                            "- **Status**: {}",
                            if open { "Open now" } else { "Closed" }
                        ));
                    }
                    if let Some(count) = entry.get("user_ratings_total").and_then(Value::as_i64) {
                        if count > 0 {
                            lines.push(format!("- **Reviews**: {count} ratings"));
                        }
                    }
                    lines.push(format!("- **Place ID**: {}", str_field(entry, "place_id")));
                    lines.push(String::new());
                }
            }
            lines.join("\n")
        };

        Ok(format::clip_tail(
            report,
            "Try reducing radius_miles or max_results.",
        ))
    }

    async fn tool_text_search(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let query = reader.required_str_bounded("query", 2, 500);
        let location_bias = reader.optional_str_bounded("location_bias", 500);
        let max_results = reader.int_in_range("max_results", 10, 1, 20);
        let response_format = reader.response_format();
        reader.finish("google_places_text_search")?;
        let query = query.unwrap_or_default();

        let mut body = json!({
            "textQuery": query,
            "maxResultCount": max_results
        });
        if let Some(bias) = location_bias {
            if let Some(coords) = self.resolve_location(&bias).await? {
                body["locationBias"] = json!({
                    "circle": {
                        "center": {
                            "latitude": coords.latitude,
                            "longitude": coords.longitude
                        },
                        "radius": 50000
                    }
                });
            }
        }

        let data = self.places_post("places:searchText", TEXT_FIELD_MASK, &body).await?;
        let places = data.get("places").and_then(Value::as_array).cloned().unwrap_or_default();
        if places.is_empty() {
            return Ok(format!("No results found for query: '{query}'"));
        }

        let results: Vec<Value> = places.iter().map(text_place_entry).collect();
        let report = if response_format.is_json() {
            serde_json::to_string_pretty(&json!({
                "query": query,
                "results": results,
                "total_results": results.len()
            }))?
        } else {
            let mut lines = vec![
                format!("# Search Results: \"{query}\""),
                format!("Found {} results", results.len()),
                String::new(),
            ];
            for place in &results {
                let rating = match place.get("rating").and_then(Value::as_f64) {
                    Some(r) => format!("⭐ {r}"),
                    None => "No rating".to_string(),
                };
                lines.push(format!("## {} {rating}", str_field(place, "name")));
                lines.push(format!("- **Address**: {}", str_field(place, "address")));
                if let Some(types) = place.get("types").and_then(Value::as_array) {
                    if let Some(primary) = types.first().and_then(Value::as_str) {
                        lines.push(format!("- **Type**: {}", title_case(primary)));
                    }
                }
                if let Some(phone) = place.get("phone").and_then(Value::as_str) {
                    lines.push(format!("- **Phone**: {phone}"));
                }
                if let Some(website) = place.get("website").and_then(Value::as_str) {
                    lines.push(format!("- **Website**: {website}"));
                }
                if let Some(count) = place.get("user_ratings_total").and_then(Value::as_i64) {
                    if count > 0 {
                        lines.push(format!("- **Reviews**: {count} ratings"));
                    }
                }
                if let Some(lat) = place
                    .get("coordinates")
                    .and_then(|c| c.get("latitude"))
                    .and_then(Value::as_f64)
                {
                    let lng = place
                        .get("coordinates")
                        .and_then(|c| c.get("longitude"))
                        .and_then(Value::as_f64)
                        .unwrap_or_default();
                    lines.push(format!("- **Coordinates**: {lat}, {lng}"));
                }
                lines.push(format!("- **Place ID**: {}", str_field(place, "place_id")));
                lines.push(String::new());
            }
            lines.join("\n")
        };

        Ok(format::clip_tail(report, "Try reducing max_results."))
    }

    async fn tool_place_details(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let place_id = reader.required_str_bounded("place_id", 10, 200);
        let include_reviews = reader.bool_or("include_reviews", true);
        let max_reviews = reader.int_in_range("max_reviews", 5, 1, 20) as usize;
        let response_format = reader.response_format();
        reader.finish("google_places_get_details")?;
        let place_id = place_id.unwrap_or_default();

        let mut field_mask_parts = vec![
            "displayName",
            "formattedAddress",
            "rating",
            "userRatingCount",
            "nationalPhoneNumber",
            "internationalPhoneNumber",
            "websiteUri",
            "googleMapsUri",
            "types",
            "location",
            "currentOpeningHours",
            "priceLevel",
            "takeout",
            "delivery",
            "dineIn",
            "servesVegetarianFood",
            "wheelchairAccessibleEntrance",
            "wheelchairAccessibleParking",
            "wheelchairAccessibleRestroom",
            "wheelchairAccessibleSeating",
            "parkingOptions",
            "paymentOptions",
            "goodForChildren",
            "goodForGroups",
            "allowsDogs",
        ];
        if include_reviews {
            field_mask_parts.push("reviews");
        }
        let key = self.api_key()?;
        let builder = self
            .places
            .request(reqwest::Method::GET, &format!("places/{place_id}"))?
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", field_mask_parts.join(","));
        let place = self.places.send(builder).await?;

        let report = if response_format.is_json() {
            render_details_json(&place, include_reviews, max_reviews)?
        } else {
            render_details_markdown(&place, include_reviews, max_reviews)
        };
        Ok(format::clip_tail(
            report,
            "Try setting include_reviews=false or reducing max_reviews.",
        ))
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    async fn tool_compute_route(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let origin = reader.required_str_bounded("origin", 3, 500);
        let destination = reader.required_str_bounded("destination", 3, 500);
        let travel_mode = reader.choice("travel_mode", TRAVEL_MODES, "DRIVE");
        let departure_time = reader.optional_str_bounded("departure_time", 100);
        let response_format = reader.response_format();
        reader.finish("google_routes_compute_route")?;
        let origin = origin.unwrap_or_default();
        let destination = destination.unwrap_or_default();

        let mut body = json!({
            "origin": {"address": origin},
            "destination": {"address": destination},
            "travelMode": travel_mode,
            "computeAlternativeRoutes": false,
            "routeModifiers": {
                "avoidTolls": false,
                "avoidHighways": false,
                "avoidFerries": false
            }
        });
        if let Some(departure_time) = departure_time {
            body["departureTime"] = json!(departure_time);
        }

        let key = self.api_key()?;
        let builder = self
            .routes
            .request(reqwest::Method::POST, "directions/v2:computeRoutes")?
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", ROUTE_FIELD_MASK)
            .json(&body);
        let data = self.routes.send(builder).await?;

        let routes = data.get("routes").and_then(Value::as_array).cloned().unwrap_or_default();
        let Some(route) = routes.first() else {
            return Ok(format!(
                "No route found between '{origin}' and '{destination}'"
            ));
        };
        let leg = route
            .get("legs")
            .and_then(Value::as_array)
            .and_then(|l| l.first().cloned())
            .unwrap_or_else(|| json!({}));

        let distance_meters = leg.get("distanceMeters").and_then(Value::as_i64).unwrap_or(0);
        let distance_miles = meters_to_miles(distance_meters as f64);
        let duration_seconds = parse_duration_secs(&leg, "duration");
        let static_duration = parse_duration_secs(&leg, "staticDuration");

        let steps: Vec<Value> = leg
            .get("steps")
            .and_then(Value::as_array)
            .map(|steps| {
                steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| {
                        let instruction = step
                            .get("navigationInstruction")
                            .and_then(|n| n.get("instructions"))
                            .and_then(Value::as_str)
                            .unwrap_or("Continue");
                        json!({
                            "step_number": i + 1,
                            "instruction": instruction,
                            "distance_miles": round2(meters_to_miles(
                                step.get("distanceMeters").and_then(Value::as_f64).unwrap_or(0.0)
                            )),
                            "duration": format_duration(parse_duration_secs(step, "duration"))
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "origin": origin,
                "destination": destination,
                "travel_mode": travel_mode,
                "distance_miles": round2(distance_miles),
                "distance_meters": distance_meters,
                "duration_seconds": duration_seconds,
                "duration_formatted": format_duration(duration_seconds),
                "static_duration_seconds": static_duration,
                "steps": steps
            }))?);
        }

        let mut lines = vec![
            format!("# Route: {origin} → {destination}"),
            format!("Travel Mode: {travel_mode}"),
            String::new(),
            "## Summary".to_string(),
            format!("- **Distance**: {:.2} miles ({distance_meters} meters)", distance_miles),
            format!("- **Duration**: {}", format_duration(duration_seconds)),
        ];
        if static_duration > 0 && static_duration != duration_seconds {
            lines.push(format!(
                "- **Duration without traffic**: {}",
                format_duration(static_duration)
            ));
            let delay = duration_seconds - static_duration;
            if delay > 0 {
                lines.push(format!("- **Traffic delay**: +{}", format_duration(delay)));
            }
        }
        lines.push(String::new());
        if !steps.is_empty() {
            lines.push("## Route Instructions".to_string());
            for step in &steps {
                lines.push(format!(
                    "{}. {} - {:.1} mi ({})",
                    step["step_number"],
                    step["instruction"].as_str().unwrap_or("Continue"),
                    step["distance_miles"].as_f64().unwrap_or(0.0),
                    step["duration"].as_str().unwrap_or("0m"),
                ));
            }
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }

    async fn tool_distance_matrix(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let origins = reader.required_str_list("origins", 1, 25);
        let destinations = reader.required_str_list("destinations", 1, 25);
        let travel_mode = reader.choice("travel_mode", TRAVEL_MODES, "DRIVE");
        let response_format = reader.response_format();
        if let (Some(origins), Some(destinations)) = (&origins, &destinations) {
            if origins.len() * destinations.len() > MAX_MATRIX_COMBINATIONS {
                reader.violation(
                    "origins",
                    format!(
                        "origin-destination combinations must not exceed {MAX_MATRIX_COMBINATIONS}"
                    ),
                );
            }
        }
        reader.finish("google_routes_compute_distance_matrix")?;
        let origins = origins.unwrap_or_default();
        let destinations = destinations.unwrap_or_default();

        let body = json!({
            "origins": origins.iter().map(|o| json!({"waypoint": {"address": o}})).collect::<Vec<_>>(),
            "destinations": destinations.iter().map(|d| json!({"waypoint": {"address": d}})).collect::<Vec<_>>(),
            "travelMode": travel_mode
        });
        let entries = self.route_matrix(&body).await?;

        let mut matrix = Vec::new();
        for entry in &entries {
            let origin_idx = entry.get("originIndex").and_then(Value::as_u64).unwrap_or(0) as usize;
            let dest_idx = entry.get("destinationIndex").and_then(Value::as_u64).unwrap_or(0) as usize;
            let (Some(origin), Some(destination)) =
                (origins.get(origin_idx), destinations.get(dest_idx))
            else {
                continue;
            };
            if matrix_entry_ok(entry) {
                let distance_meters = entry.get("distanceMeters").and_then(Value::as_i64).unwrap_or(0);
                let duration_seconds = parse_duration_secs(entry, "duration");
                matrix.push(json!({
                    "origin": origin,
                    "destination": destination,
                    "distance_miles": round2(meters_to_miles(distance_meters as f64)),
                    "distance_meters": distance_meters,
                    "duration_seconds": duration_seconds,
                    "duration_formatted": format_duration(duration_seconds),
                    "status": "OK"
                }));
            } else {
                matrix.push(json!({
                    "origin": origin,
                    "destination": destination,
                    "status": "UNAVAILABLE",
                    "error": entry.get("condition").and_then(Value::as_str).unwrap_or("No route found")
                }));
            }
        }

        let report = if response_format.is_json() {
            serde_json::to_string_pretty(&json!({
                "origins": origins,
                "destinations": destinations,
                "travel_mode": travel_mode,
                "total_combinations": origins.len() * destinations.len(),
                "matrix": matrix
            }))?
        } else {
            let mut lines = vec![
                "# Distance Matrix".to_string(),
                format!(
                    "Origins: {} | Destinations: {} | Travel Mode: {travel_mode}",
                    origins.len(),
                    destinations.len()
                ),
                String::new(),
                "## Results".to_string(),
                String::new(),
            ];
            for origin in &origins {
                lines.push(format!("### From: {origin}"));
                for row in matrix.iter().filter(|r| r["origin"].as_str() == Some(origin.as_str())) {
                    if row["status"].as_str() == Some("OK") {
                        lines.push(format!(
                            "- To **{}**: {} mi, {}",
                            row["destination"].as_str().unwrap_or(""),
                            row["distance_miles"],
                            row["duration_formatted"].as_str().unwrap_or(""),
                        ));
                    } else {
                        lines.push(format!(
                            "- To **{}**: Route unavailable ({})",
                            row["destination"].as_str().unwrap_or(""),
                            row["error"].as_str().unwrap_or("Unknown error"),
                        ));
                    }
                }
                lines.push(String::new());
            }
            lines.join("\n")
        };

        Ok(format::clip_tail(
            report,
            "Try reducing the number of origins or destinations.",
        ))
    }

    // -----------------------------------------------------------------------
    // Geocoding
    // -----------------------------------------------------------------------

    async fn geocode_query(&self, query: &[(&str, String)]) -> Result<Value> {
        self.geocoding.get("json", query).await
    }

    async fn tool_geocode(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let address = reader.required_str_bounded("address", 3, 500);
        let response_format = reader.response_format();
        reader.finish("google_geocoding_geocode")?;
        let address = address.unwrap_or_default();

        let key = self.api_key()?;
        let data = self.geocode_query(&[("address", address.clone()), ("key", key)]).await?;
        if data.get("status").and_then(Value::as_str) != Some("OK") {
            return Ok(format!(
                "Error: Could not geocode address '{address}'. Status: {}",
                data.get("status").and_then(Value::as_str).unwrap_or("UNKNOWN")
            ));
        }
        let result = data
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first().cloned())
            .unwrap_or_else(|| json!({}));
        let coords = result
            .pointer("/geometry/location")
            .cloned()
            .unwrap_or_else(|| json!({}));

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "input_address": address,
                "formatted_address": result.get("formatted_address"),
                "coordinates": {
                    "latitude": coords.get("lat"),
                    "longitude": coords.get("lng")
                },
                "address_components": result.get("address_components"),
                "location_type": result.pointer("/geometry/location_type"),
                "place_id": result.get("place_id")
            }))?);
        }

        let mut lines = vec![
            "# Geocoding Result".to_string(),
            String::new(),
            "## Address".to_string(),
            format!("**Input**: {address}"),
            format!("**Formatted**: {}", str_field(&result, "formatted_address")),
            String::new(),
            "## Coordinates".to_string(),
            format!("- **Latitude**: {}", coords.get("lat").unwrap_or(&Value::Null)),
            format!("- **Longitude**: {}", coords.get("lng").unwrap_or(&Value::Null)),
            String::new(),
        ];
        push_component_lines(&mut lines, &result);
        lines.push(format!(
            "**Location Type**: {}",
            result
                .pointer("/geometry/location_type")
                .and_then(Value::as_str)
                .unwrap_or("N/A")
        ));
        lines.push(format!("**Place ID**: {}", str_field(&result, "place_id")));
        Ok(lines.join("\n"))
    }

    async fn tool_reverse_geocode(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let latitude = reader.float_in_range("latitude", f64::NAN, -90.0, 90.0);
        let longitude = reader.float_in_range("longitude", f64::NAN, -180.0, 180.0);
        if params.get("latitude").is_none_or(Value::is_null) {
            reader.violation("latitude", "required");
        }
        if params.get("longitude").is_none_or(Value::is_null) {
            reader.violation("longitude", "required");
        }
        let response_format = reader.response_format();
        reader.finish("google_geocoding_reverse_geocode")?;

        let key = self.api_key()?;
        let data = self
            .geocode_query(&[("latlng", format!("{latitude},{longitude}")), ("key", key)])
            .await?;
        if data.get("status").and_then(Value::as_str) != Some("OK") {
            return Ok(format!(
                "Error: Could not reverse geocode coordinates ({latitude}, {longitude}). Status: {}",
                data.get("status").and_then(Value::as_str).unwrap_or("UNKNOWN")
            ));
        }
        let result = data
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first().cloned())
            .unwrap_or_else(|| json!({}));

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "coordinates": {"latitude": latitude, "longitude": longitude},
                "formatted_address": result.get("formatted_address"),
                "address_components": result.get("address_components"),
                "place_id": result.get("place_id")
            }))?);
        }

        let mut lines = vec![
            "# Reverse Geocoding Result".to_string(),
            String::new(),
            "## Coordinates".to_string(),
            format!("Latitude: {latitude}, Longitude: {longitude}"),
            String::new(),
            "## Address".to_string(),
            str_field(&result, "formatted_address").to_string(),
            String::new(),
        ];
        push_component_lines(&mut lines, &result);
        lines.push(format!("**Place ID**: {}", str_field(&result, "place_id")));
        Ok(lines.join("\n"))
    }

    async fn tool_validate_address(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let address = reader.required_str_bounded("address", 3, 500);
        reader.finish("google_geocoding_validate_address")?;
        let address = address.unwrap_or_default();

        let key = self.api_key()?;
        let data = self.geocode_query(&[("address", address.clone()), ("key", key)]).await?;
        let result = data
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first().cloned());
        let Some(result) = result else {
            return Ok(format!("Error: Could not validate address: {address}"));
        };

        let mut components = serde_json::Map::new();
        let mut state_code = Value::Null;
        if let Some(raw) = result.get("address_components").and_then(Value::as_array) {
            for component in raw {
                let Some(types) = component.get("types").and_then(Value::as_array) else {
                    continue;
                };
                for comp_type in types.iter().filter_map(Value::as_str) {
                    components.insert(
                        comp_type.to_string(),
                        component.get("long_name").cloned().unwrap_or(Value::Null),
                    );
                    if comp_type == "administrative_area_level_1" {
                        state_code = component.get("short_name").cloned().unwrap_or(Value::Null);
                    }
                }
            }
        }

        let coords = result.pointer("/geometry/location").cloned().unwrap_or_else(|| json!({}));
        Ok(serde_json::to_string_pretty(&json!({
            "status": "success",
            "input_address": address,
            "formatted_address": result.get("formatted_address"),
            "latitude": coords.get("lat"),
            "longitude": coords.get("lng"),
            "place_id": result.get("place_id"),
            "location_type": result.pointer("/geometry/location_type"),
            "address_components": {
                "street_number": components.get("street_number"),
                "street": components.get("route"),
                "city": components.get("locality"),
                "county": components.get("administrative_area_level_2"),
                "state": components.get("administrative_area_level_1"),
                "state_code": state_code,
                "zip_code": components.get("postal_code"),
                "country": components.get("country")
            }
        }))?)
    }
}

impl Default for PlacesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Geometry and parsing helpers
// ---------------------------------------------------------------------------

/// Parse a `"lat,lon"` string into coordinates, if it is one.
fn parse_coordinates(location: &str) -> Option<Coordinates> {
    let (lat_raw, lng_raw) = location.split_once(',')?;
    let latitude: f64 = lat_raw.trim().parse().ok()?;
    let longitude: f64 = lng_raw.trim().parse().ok()?;
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Some(Coordinates { latitude, longitude })
    } else {
        None
    }
}

fn first_geocode_coords(data: &Value) -> Option<Coordinates> {
    if data.get("status").and_then(Value::as_str) != Some("OK") {
        return None;
    }
    let location = data.pointer("/results/0/geometry/location")?;
    Some(Coordinates {
        latitude: location.get("lat")?.as_f64()?,
        longitude: location.get("lng")?.as_f64()?,
    })
}

fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

/// Great-circle distance in miles.
fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// The Routes API encodes durations as `"123s"` strings.
fn parse_duration_secs(value: &Value, field: &str) -> i64 {
    value
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| s.trim_end_matches('s').parse().ok())
        .unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn title_case(place_type: &str) -> String {
    place_type
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("N/A")
}

fn place_coords(place: &Value) -> Option<Coordinates> {
    let location = place.get("location")?;
    Some(Coordinates {
        latitude: location.get("latitude")?.as_f64()?,
        longitude: location.get("longitude")?.as_f64()?,
    })
}

fn nearby_place_entry(place: &Value, center: Coordinates) -> Value {
    let distance = place_coords(place).map(|c| round2(haversine_miles(center, c)));
    json!({
        "name": place.pointer("/displayName/text").and_then(Value::as_str).unwrap_or("Unknown"),
        "address": place.get("formattedAddress").and_then(Value::as_str).unwrap_or("N/A"),
        "rating": place.get("rating"),
        "user_ratings_total": place.get("userRatingCount").and_then(Value::as_i64).unwrap_or(0),
        "distance_miles": distance,
        "place_id": place.get("id").and_then(Value::as_str).unwrap_or("").trim_start_matches("places/"),
        "phone": place.get("nationalPhoneNumber"),
        "open_now": place.pointer("/currentOpeningHours/openNow")
    })
}

fn text_place_entry(place: &Value) -> Value {
    json!({
        "name": place.pointer("/displayName/text").and_then(Value::as_str).unwrap_or("Unknown"),
        "address": place.get("formattedAddress").and_then(Value::as_str).unwrap_or("N/A"),
        "rating": place.get("rating"),
        "user_ratings_total": place.get("userRatingCount").and_then(Value::as_i64).unwrap_or(0),
        "place_id": place.get("id").and_then(Value::as_str).unwrap_or("").trim_start_matches("places/"),
        "types": place.get("types").cloned().unwrap_or_else(|| json!([])),
        "phone": place.get("nationalPhoneNumber"),
        "website": place.get("websiteUri"),
        "coordinates": {
            "latitude": place.pointer("/location/latitude"),
            "longitude": place.pointer("/location/longitude")
        }
    })
}

fn matrix_entry_ok(entry: &Value) -> bool {
    match entry.get("status") {
        // An empty status object (or no status) means OK in the Routes API.
        None => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::String(s)) => s == "OK",
        _ => false,
    }
}

/// Attach drive distance and time from a route-matrix response.
///
/// `entries` must be ordered the way the matrix destinations were built:
/// only places with known coordinates were sent, in order.
fn apply_drive_metrics(entries: &mut [Value], matrix: &[Value]) {
    let indexed: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e["distance_miles"].is_null())
        .map(|(i, _)| i)
        .collect();
    for row in matrix {
        if !matrix_entry_ok(row) {
            continue;
        }
        let dest_idx = row.get("destinationIndex").and_then(Value::as_u64).unwrap_or(0) as usize;
        let Some(&entry_idx) = indexed.get(dest_idx) else {
            continue;
        };
        if let Some(meters) = row.get("distanceMeters").and_then(Value::as_f64) {
            entries[entry_idx]["distance_miles"] = json!(round2(meters_to_miles(meters)));
        }
        let secs = parse_duration_secs(row, "duration");
        if secs > 0 {
            entries[entry_idx]["drive_time_minutes"] = json!(round1(secs as f64 / 60.0));
        }
    }
}

/// Sort ascending by distance; entries without one go last.
fn sort_by_distance(entries: &mut [Value]) {
    entries.sort_by(|a, b| {
        let da = a.get("distance_miles").and_then(Value::as_f64).unwrap_or(f64::INFINITY);
        let db = b.get("distance_miles").and_then(Value::as_f64).unwrap_or(f64::INFINITY);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn push_component_lines(lines: &mut Vec<String>, result: &Value) {
    let Some(components) = result.get("address_components").and_then(Value::as_array) else {
        return;
    };
    if components.is_empty() {
        return;
    }
    lines.push("## Location Details".to_string());
    for component in components {
        let types = component
            .get("types")
            .and_then(Value::as_array)
            .map(|t| {
                t.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        lines.push(format!(
            "- **{}** ({types})",
            component.get("long_name").and_then(Value::as_str).unwrap_or("Unknown")
        ));
    }
    lines.push(String::new());
}

// ---------------------------------------------------------------------------
// Place details rendering
// ---------------------------------------------------------------------------

fn render_details_markdown(place: &Value, include_reviews: bool, max_reviews: usize) -> String {
    let mut lines = Vec::new();
    let name = place.pointer("/displayName/text").and_then(Value::as_str).unwrap_or("Unknown Place");
    let review_count = place.get("userRatingCount").and_then(Value::as_i64).unwrap_or(0);

    lines.push(format!("# {name}"));
    if let Some(rating) = place.get("rating").and_then(Value::as_f64) {
        lines.push(format!("⭐ {rating} rating ({review_count} reviews)"));
    }
    lines.push(String::new());

    lines.push("## Basic Information".to_string());
    lines.push(format!("- **Address**: {}", str_field(place, "formattedAddress")));
    if let Some(phone) = place.get("nationalPhoneNumber").and_then(Value::as_str) {
        lines.push(format!("- **Phone**: {phone}"));
    }
    if let Some(website) = place.get("websiteUri").and_then(Value::as_str) {
        lines.push(format!("- **Website**: {website}"));
    }
    if let Some(maps_url) = place.get("googleMapsUri").and_then(Value::as_str) {
        lines.push(format!("- **Google Maps**: {maps_url}"));
    }
    if let Some(primary) = place
        .get("types")
        .and_then(Value::as_array)
        .and_then(|t| t.first())
        .and_then(Value::as_str)
    {
        lines.push(format!("- **Type**: {}", title_case(primary)));
    }
    if let Some(lat) = place.pointer("/location/latitude").and_then(Value::as_f64) {
        let lng = place.pointer("/location/longitude").and_then(Value::as_f64).unwrap_or_default();
        lines.push(format!("- **Coordinates**: {lat}, {lng}"));
    }
    lines.push(String::new());

    if let Some(weekday) = place
        .pointer("/currentOpeningHours/weekdayDescriptions")
        .and_then(Value::as_array)
    {
        lines.push("## Hours".to_string());
        for day in weekday.iter().filter_map(Value::as_str) {
            lines.push(format!("- {day}"));
        }
        lines.push(String::new());
    }

    let feature_flags = [
        ("takeout", "Takeout"),
        ("delivery", "Delivery"),
        ("dineIn", "Dine-in"),
        ("servesVegetarianFood", "Vegetarian options"),
        ("goodForChildren", "Good for children"),
        ("goodForGroups", "Good for groups"),
        ("allowsDogs", "Dogs allowed"),
    ];
    let features: Vec<&str> = feature_flags
        .iter()
        .filter(|(field, _)| place.get(*field).and_then(Value::as_bool).unwrap_or(false))
        .map(|(_, label)| *label)
        .collect();
    if !features.is_empty() {
        lines.push("## Features & Amenities".to_string());
        lines.push(format!("- {}", features.join(", ")));
        lines.push(String::new());
    }

    let accessibility_flags = [
        ("wheelchairAccessibleEntrance", "Wheelchair accessible entrance"),
        ("wheelchairAccessibleParking", "Wheelchair accessible parking"),
        ("wheelchairAccessibleRestroom", "Wheelchair accessible restroom"),
        ("wheelchairAccessibleSeating", "Wheelchair accessible seating"),
    ];
    let accessibility: Vec<&str> = accessibility_flags
        .iter()
        .filter(|(field, _)| place.get(*field).and_then(Value::as_bool).unwrap_or(false))
        .map(|(_, label)| *label)
        .collect();
    if !accessibility.is_empty() {
        lines.push("## Accessibility".to_string());
        for item in accessibility {
            lines.push(format!("- {item}"));
        }
        lines.push(String::new());
    }

    if include_reviews {
        if let Some(reviews) = place.get("reviews").and_then(Value::as_array) {
            if !reviews.is_empty() {
                let shown = reviews.len().min(max_reviews);
                lines.push(format!(
                    "## Recent Reviews (showing {shown} of {review_count})"
                ));
                lines.push(String::new());
                for review in reviews.iter().take(max_reviews) {
                    let author = review
                        .pointer("/authorAttribution/displayName")
                        .and_then(Value::as_str)
                        .unwrap_or("Anonymous");
                    let rating = review.get("rating").and_then(Value::as_f64).unwrap_or(0.0);
                    let rel_time = review
                        .get("relativePublishTimeDescription")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    lines.push(format!("### ⭐ {rating} - {author} ({rel_time})"));
                    if let Some(text) = review.pointer("/text/text").and_then(Value::as_str) {
                        lines.push(format::preview(text, 500));
                    }
                    lines.push(String::new());
                }
            }
        }
    }

    lines.join("\n")
}

fn render_details_json(place: &Value, include_reviews: bool, max_reviews: usize) -> Result<String> {
    let mut result = json!({
        "name": place.pointer("/displayName/text"),
        "address": place.get("formattedAddress"),
        "phone": place.get("nationalPhoneNumber"),
        "website": place.get("websiteUri"),
        "google_maps_url": place.get("googleMapsUri"),
        "rating": place.get("rating"),
        "user_ratings_total": place.get("userRatingCount"),
        "types": place.get("types"),
        "price_level": place.get("priceLevel"),
        "coordinates": place.get("location"),
        "opening_hours": place.get("currentOpeningHours"),
        "features": {
            "takeout": place.get("takeout"),
            "delivery": place.get("delivery"),
            "dine_in": place.get("dineIn"),
            "good_for_children": place.get("goodForChildren"),
            "good_for_groups": place.get("goodForGroups"),
            "allows_dogs": place.get("allowsDogs")
        },
        "accessibility": {
            "wheelchair_accessible_entrance": place.get("wheelchairAccessibleEntrance"),
            "wheelchair_accessible_parking": place.get("wheelchairAccessibleParking"),
            "wheelchair_accessible_restroom": place.get("wheelchairAccessibleRestroom"),
            "wheelchair_accessible_seating": place.get("wheelchairAccessibleSeating")
        },
        "parking_options": place.get("parkingOptions"),
        "payment_options": place.get("paymentOptions")
    });
    if include_reviews {
        let reviews: Vec<Value> = place
            .get("reviews")
            .and_then(Value::as_array)
            .map(|reviews| {
                reviews
                    .iter()
                    .take(max_reviews)
                    .map(|r| {
                        json!({
                            "author": r.pointer("/authorAttribution/displayName"),
                            "rating": r.get("rating"),
                            "text": r.pointer("/text/text"),
                            "relative_time": r.get("relativePublishTimeDescription")
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        result["reviews"] = json!(reviews);
    }
    Ok(serde_json::to_string_pretty(&result)?)
}

// ---------------------------------------------------------------------------
// Adapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for PlacesAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Geospatial
    }

    fn health_check(&self) -> HealthStatus {
        if self.api_key().is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let response_format = json!({
            "type": "string",
            "enum": ["markdown", "json"],
            "description": "Output format: 'markdown' or 'json'",
            "default": "markdown"
        });
        let travel_mode = json!({
            "type": "string",
            "enum": TRAVEL_MODES,
            "description": "Mode of transportation",
            "default": "DRIVE"
        });
        vec![
            ToolDefinition {
                name: "google_places_nearby_search".to_string(),
                description: "Find places of given types near a location, sorted by distance from the center".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": {"type": "string", "description": "Address or 'lat,lon' coordinates to search near", "minLength": 3, "maxLength": 500},
                        "place_types": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 10, "description": "Place types, e.g. ['hospital', 'pharmacy', 'restaurant']"},
                        "radius_miles": {"type": "number", "minimum": 0.1, "maximum": 50.0, "default": 10.0},
                        "max_results": {"type": "integer", "minimum": 1, "maximum": 20, "default": 20, "description": "Maximum results per place type"},
                        "response_format": response_format
                    },
                    "required": ["location", "place_types"]
                }),
            },
            ToolDefinition {
                name: "google_places_text_search".to_string(),
                description: "Search for places by free-text query, optionally biased toward a location".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "minLength": 2, "maxLength": 500},
                        "location_bias": {"type": "string", "description": "Address or 'lat,lon' coordinates to bias results toward", "maxLength": 500},
                        "max_results": {"type": "integer", "minimum": 1, "maximum": 20, "default": 10},
                        "response_format": response_format
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "google_places_get_details".to_string(),
                description: "Get comprehensive details for a place: contact info, hours, amenities, accessibility, reviews".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "place_id": {"type": "string", "minLength": 10, "maxLength": 200},
                        "include_reviews": {"type": "boolean", "default": true},
                        "max_reviews": {"type": "integer", "minimum": 1, "maximum": 20, "default": 5},
                        "response_format": response_format
                    },
                    "required": ["place_id"]
                }),
            },
            ToolDefinition {
                name: "google_routes_compute_route".to_string(),
                description: "Calculate route, distance, and travel time between two locations with optional traffic-aware departure time".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "origin": {"type": "string", "minLength": 3, "maxLength": 500},
                        "destination": {"type": "string", "minLength": 3, "maxLength": 500},
                        "travel_mode": travel_mode,
                        "departure_time": {"type": "string", "description": "ISO 8601 departure time for traffic-aware routing", "maxLength": 100},
                        "response_format": response_format
                    },
                    "required": ["origin", "destination"]
                }),
            },
            ToolDefinition {
                name: "google_routes_compute_distance_matrix".to_string(),
                description: "Calculate distances and durations for multiple origin-destination pairs (max 100 combinations)".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "origins": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 25},
                        "destinations": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 25},
                        "travel_mode": travel_mode,
                        "response_format": response_format
                    },
                    "required": ["origins", "destinations"]
                }),
            },
            ToolDefinition {
                name: "google_geocoding_geocode".to_string(),
                description: "Convert an address to coordinates with formatted address details".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "address": {"type": "string", "minLength": 3, "maxLength": 500},
                        "response_format": response_format
                    },
                    "required": ["address"]
                }),
            },
            ToolDefinition {
                name: "google_geocoding_reverse_geocode".to_string(),
                description: "Convert coordinates to a human-readable address".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "latitude": {"type": "number", "minimum": -90.0, "maximum": 90.0},
                        "longitude": {"type": "number", "minimum": -180.0, "maximum": 180.0},
                        "response_format": response_format
                    },
                    "required": ["latitude", "longitude"]
                }),
            },
            ToolDefinition {
                name: "google_geocoding_validate_address".to_string(),
                description: "Validate and standardize an address, returning coordinates and structured components".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "address": {"type": "string", "minLength": 3, "maxLength": 500}
                    },
                    "required": ["address"]
                }),
            },
        ]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
        match name {
            "google_places_nearby_search" => self.tool_nearby_search(params).await,
            "google_places_text_search" => self.tool_text_search(params).await,
            "google_places_get_details" => self.tool_place_details(params).await,
            "google_routes_compute_route" => self.tool_compute_route(params).await,
            "google_routes_compute_distance_matrix" => self.tool_distance_matrix(params).await,
            "google_geocoding_geocode" => self.tool_geocode(params).await,
            "google_geocoding_reverse_geocode" => self.tool_reverse_geocode(params).await,
            "google_geocoding_validate_address" => self.tool_validate_address(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".to_string(),
            env_var: API_KEY_ENV.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_strings_are_parsed_directly() {
        let coords = parse_coordinates("32.0809,-81.0912").unwrap();
        assert!((coords.latitude - 32.0809).abs() < 1e-9);
        assert!((coords.longitude + 81.0912).abs() < 1e-9);
        // Whitespace around the comma is accepted.
        assert!(parse_coordinates(" 32.0809 , -81.0912 ").is_some());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(parse_coordinates("91.0,-81.0").is_none());
        assert!(parse_coordinates("32.0,-181.0").is_none());
        assert!(parse_coordinates("not,coords").is_none());
        assert!(parse_coordinates("249 Holland Drive, Savannah, GA 31419").is_none());
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Savannah, GA to Savannah airport is roughly 11 miles as the crow flies.
        let downtown = Coordinates { latitude: 32.0809, longitude: -81.0912 };
        let airport = Coordinates { latitude: 32.1276, longitude: -81.2021 };
        let miles = haversine_miles(downtown, airport);
        assert!(miles > 6.0 && miles < 9.0, "got {miles}");
        assert!(haversine_miles(downtown, downtown).abs() < 1e-9);
    }

    #[test]
    fn durations_format_as_hours_and_minutes() {
        assert_eq!(format_duration(45), "0m");
        assert_eq!(format_duration(90), "1m");
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(5400), "1h 30m");
    }

    #[test]
    fn route_durations_strip_the_seconds_suffix() {
        let leg = json!({"duration": "1234s", "staticDuration": "1200s"});
        assert_eq!(parse_duration_secs(&leg, "duration"), 1234);
        assert_eq!(parse_duration_secs(&leg, "staticDuration"), 1200);
        assert_eq!(parse_duration_secs(&leg, "missing"), 0);
    }

    #[test]
    fn meters_convert_to_miles() {
        assert_eq!(round2(meters_to_miles(1609.34)), 1.0);
        assert_eq!(round2(meters_to_miles(8046.7)), 5.0);
    }

    #[test]
    fn missing_distance_sorts_last() {
        let mut entries = vec![
            json!({"name": "far", "distance_miles": 9.3}),
            json!({"name": "unknown", "distance_miles": null}),
            json!({"name": "near", "distance_miles": 0.8}),
        ];
        sort_by_distance(&mut entries);
        let order: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert_eq!(order, vec!["near", "far", "unknown"]);
    }

    #[test]
    fn place_types_render_in_title_case() {
        assert_eq!(title_case("gas_station"), "Gas Station");
        assert_eq!(title_case("hospital"), "Hospital");
    }

    #[test]
    fn nearby_entry_computes_haversine_distance() {
        let center = Coordinates { latitude: 32.0809, longitude: -81.0912 };
        let place = json!({
            "displayName": {"text": "Memorial Health"},
            "formattedAddress": "4700 Waters Ave, Savannah, GA",
            "rating": 4.1,
            "userRatingCount": 320,
            "location": {"latitude": 32.0300, "longitude": -81.0850},
            "id": "places/ChIJabc123def456",
            "nationalPhoneNumber": "(912) 350-8000"
        });
        let entry = nearby_place_entry(&place, center);
        assert_eq!(entry["name"], "Memorial Health");
        assert_eq!(entry["place_id"], "ChIJabc123def456");
        assert!(entry["distance_miles"].as_f64().unwrap() > 3.0);
    }

    #[test]
    fn matrix_status_object_must_be_empty_to_be_ok() {
        assert!(matrix_entry_ok(&json!({"distanceMeters": 100})));
        assert!(matrix_entry_ok(&json!({"status": {}})));
        assert!(!matrix_entry_ok(&json!({"status": {"code": 5}})));
    }

    #[test]
    fn drive_metrics_map_back_through_coordinate_gaps() {
        let mut entries = vec![
            json!({"name": "a", "distance_miles": 1.0}),
            json!({"name": "no-coords", "distance_miles": null}),
            json!({"name": "b", "distance_miles": 2.0}),
        ];
        // Matrix destinations were only a and b, so destinationIndex 1 is b.
        let matrix = vec![
            json!({"destinationIndex": 0, "distanceMeters": 3218.68, "duration": "300s"}),
            json!({"destinationIndex": 1, "distanceMeters": 8046.7, "duration": "600s"}),
        ];
        apply_drive_metrics(&mut entries, &matrix);
        assert_eq!(entries[0]["distance_miles"], json!(2.0));
        assert_eq!(entries[0]["drive_time_minutes"], json!(5.0));
        assert_eq!(entries[2]["distance_miles"], json!(5.0));
        assert_eq!(entries[2]["drive_time_minutes"], json!(10.0));
        assert!(entries[1]["distance_miles"].is_null());
    }

    #[tokio::test]
    async fn matrix_combination_cap_is_enforced_before_network() {
        let adapter = PlacesAdapter::new();
        let origins: Vec<String> = (0..15).map(|i| format!("origin {i}")).collect();
        let destinations: Vec<String> = (0..15).map(|i| format!("dest {i}")).collect();
        let err = adapter
            .execute_tool(
                "google_routes_compute_distance_matrix",
                json!({"origins": origins, "destinations": destinations}),
            )
            .await
            .unwrap_err();
        assert!(err.user_message().contains("combinations must not exceed 100"));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let adapter = PlacesAdapter::new();
        if std::env::var(API_KEY_ENV).is_ok() {
            return;
        }
        let err = adapter
            .execute_tool(
                "google_geocoding_geocode",
                json!({"address": "249 Holland Drive, Savannah, GA"}),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Configuration Error: GOOGLE_MAPS_API_KEY environment variable not set"
        );
    }

    #[test]
    fn tool_definitions_are_complete() {
        let adapter = PlacesAdapter::new();
        assert_eq!(adapter.tools().len(), 8);
    }
}
