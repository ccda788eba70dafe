use reqwest::Client;
use serde_json::{json, Value};
use crate::config::EnvConfig;
use crate::data::types::Source;
use crate::sources::{FetchError, RawListing};

/// Structured-API strategy: each house has an internal search endpoint used
/// by its own frontend. The response shape is undocumented, so parsing is
/// defensive throughout — an entry missing its lot number is skipped rather
/// than failing the batch, and the attempt only fails when the expected JSON
/// path is absent or nothing usable survives.
pub struct ApiClient {
    client: Client,
    copart_url: String,
    iaai_url: String,
}

const COPART_RESULTS_PATH: &str = "/data/results/content";
const IAAI_RESULTS_PATH: &str = "/searchResults/vehicles";

impl ApiClient {
    pub fn new(env: &EnvConfig) -> Self {
        Self {
            client: Client::new(),
            copart_url: env.copart_api_url.clone(),
            iaai_url: env.iaai_api_url.clone(),
        }
    }

    pub async fn fetch_listings(
        &self,
        source: Source,
        make: &str,
        model: Option<&str>,
    ) -> Result<Vec<RawListing>, FetchError> {
        match source {
            Source::Copart => self.fetch_copart(make, model).await,
            Source::Iaai => self.fetch_iaai(make, model).await,
        }
    }

    async fn fetch_copart(
        &self,
        make: &str,
        model: Option<&str>,
    ) -> Result<Vec<RawListing>, FetchError> {
        let query = match model {
            Some(m) => format!("{} {}", make, m),
            None => make.to_string(),
        };

        let body = json!({
            "query": [query],
            "filter": {},
            "page": 0,
            "size": 50,
            "freeFormSearch": true,
        });

        let res = self
            .client
            .post(&self.copart_url)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }

        let payload: Value = res.json().await?;
        parse_copart_response(&payload)
    }

    async fn fetch_iaai(
        &self,
        make: &str,
        model: Option<&str>,
    ) -> Result<Vec<RawListing>, FetchError> {
        let mut req = self.client.get(&self.iaai_url).query(&[("make", make)]);
        if let Some(m) = model {
            req = req.query(&[("model", m)]);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }

        let payload: Value = res.json().await?;
        parse_iaai_response(&payload)
    }
}

pub fn parse_copart_response(payload: &Value) -> Result<Vec<RawListing>, FetchError> {
    let entries = payload
        .pointer(COPART_RESULTS_PATH)
        .and_then(Value::as_array)
        .ok_or(FetchError::MissingPath(COPART_RESULTS_PATH))?;

    let listings: Vec<RawListing> = entries.iter().filter_map(convert_copart_entry).collect();

    if listings.is_empty() {
        return Err(FetchError::NoListings);
    }
    Ok(listings)
}

pub fn parse_iaai_response(payload: &Value) -> Result<Vec<RawListing>, FetchError> {
    let entries = payload
        .pointer(IAAI_RESULTS_PATH)
        .and_then(Value::as_array)
        .ok_or(FetchError::MissingPath(IAAI_RESULTS_PATH))?;

    let listings: Vec<RawListing> = entries.iter().filter_map(convert_iaai_entry).collect();

    if listings.is_empty() {
        return Err(FetchError::NoListings);
    }
    Ok(listings)
}

/// Copart's payload uses terse internal field names; candidates are tried in
/// order because the names have drifted across frontend versions.
fn convert_copart_entry(entry: &Value) -> Option<RawListing> {
    // Lot number is mandatory; without it the listing has no identity.
    let lot = field(entry, &["ln", "lotNumberStr"])?;

    Some(RawListing {
        link: Some(format!("https://www.copart.com/lot/{}", lot)),
        lot: Some(lot),
        title: field(entry, &["ld"]),
        make: field(entry, &["mkn"]),
        model: field(entry, &["lm", "mmod"]),
        year: field(entry, &["lcy"]).and_then(|y| y.parse().ok()),
        vin: field(entry, &["fv", "vin"]),
        color: field(entry, &["clr"]),
        transmission: field(entry, &["tmtp"]),
        fuel_type: field(entry, &["ft"]),
        damage_type: field(entry, &["dd"]),
        secondary_damage: field(entry, &["sdd"]),
        driveable: field(entry, &["drv"]),
        keys: field(entry, &["hk"]),
        odometer: field(entry, &["orr"]),
        current_bid: field(entry, &["hb"]),
        estimated_value: field(entry, &["la", "rc"]),
        auction_date: field(entry, &["ad"]),
        sale_status: field(entry, &["lsts"]),
        buy_now_price: field(entry, &["bnp"]),
        image_url: field(entry, &["tims"]),
    })
}

fn convert_iaai_entry(entry: &Value) -> Option<RawListing> {
    let lot = field(entry, &["StockNumber", "stockNumber"])?;

    Some(RawListing {
        link: Some(format!(
            "https://www.iaai.com/VehicleDetail/{}~US",
            lot
        )),
        lot: Some(lot),
        title: field(entry, &["Title"]),
        make: field(entry, &["Make"]),
        model: field(entry, &["Model"]),
        year: field(entry, &["Year"]).and_then(|y| y.parse().ok()),
        vin: field(entry, &["VIN", "Vin"]),
        color: field(entry, &["Color"]),
        transmission: field(entry, &["Transmission"]),
        fuel_type: field(entry, &["FuelType"]),
        damage_type: field(entry, &["PrimaryDamage"]),
        secondary_damage: field(entry, &["SecondaryDamage"]),
        driveable: field(entry, &["RunAndDrive"]),
        keys: field(entry, &["Keys"]),
        odometer: field(entry, &["Odometer"]),
        current_bid: field(entry, &["CurrentBid"]),
        estimated_value: field(entry, &["ACV", "ActualCashValue"]),
        auction_date: field(entry, &["AuctionDate"]),
        sale_status: field(entry, &["SaleStatus"]),
        buy_now_price: field(entry, &["BuyNowPrice"]),
        image_url: field(entry, &["ImageUrl", "ThumbnailUrl"]),
    })
}

/// First present candidate key, stringified. Numbers become their display
/// form so the normalizer's coercion path handles both shapes.
fn field(entry: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match entry.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copart_parse_happy_path() {
        let payload = json!({
            "data": {
                "results": {
                    "content": [
                        {
                            "ln": 54821990,
                            "mkn": "TESLA",
                            "lm": "MODEL 3",
                            "lcy": 2021,
                            "dd": "Front End",
                            "orr": 31250,
                            "hb": 8250.0
                        },
                        {
                            // No lot number: skipped, not fatal
                            "mkn": "TESLA",
                            "lm": "MODEL Y"
                        }
                    ]
                }
            }
        });

        let listings = parse_copart_response(&payload).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].lot.as_deref(), Some("54821990"));
        assert_eq!(listings[0].model.as_deref(), Some("MODEL 3"));
        assert_eq!(listings[0].year, Some(2021));
        assert_eq!(listings[0].current_bid.as_deref(), Some("8250.0"));
        assert_eq!(
            listings[0].link.as_deref(),
            Some("https://www.copart.com/lot/54821990")
        );
    }

    #[test]
    fn test_copart_missing_path_rejected() {
        let payload = json!({ "data": { "somethingElse": [] } });
        assert!(matches!(
            parse_copart_response(&payload),
            Err(FetchError::MissingPath(_))
        ));
    }

    #[test]
    fn test_copart_all_entries_unusable_rejected() {
        let payload = json!({
            "data": { "results": { "content": [ { "mkn": "TESLA" } ] } }
        });
        assert!(matches!(
            parse_copart_response(&payload),
            Err(FetchError::NoListings)
        ));
    }

    #[test]
    fn test_iaai_parse_happy_path() {
        let payload = json!({
            "searchResults": {
                "vehicles": [
                    {
                        "StockNumber": "29184077",
                        "Make": "Tesla",
                        "Model": "Model Y",
                        "Year": "2022",
                        "PrimaryDamage": "Rear End",
                        "RunAndDrive": "Yes",
                        "CurrentBid": "11,500",
                        "ACV": "27,800"
                    }
                ]
            }
        });

        let listings = parse_iaai_response(&payload).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].lot.as_deref(), Some("29184077"));
        assert_eq!(listings[0].year, Some(2022));
        assert_eq!(listings[0].estimated_value.as_deref(), Some("27,800"));
    }
}
