use regex::Regex;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use crate::config::EnvConfig;
use crate::data::types::Source;
use crate::sources::{FetchError, RawListing};

/// Pass-through page fetch. Both houses block cross-origin reads, so search
/// pages go through a generic "retrieve this URL's body" proxy. Transport is
/// the only concern here; parsing lives below so it can run on fixture HTML.
pub struct PageFetcher {
    client: Client,
    proxy_base: String,
    copart_search_url: String,
    iaai_search_url: String,
}

impl PageFetcher {
    pub fn new(env: &EnvConfig) -> Self {
        Self {
            client: Client::new(),
            proxy_base: env.proxy_base_url.clone(),
            copart_search_url: env.copart_search_url.clone(),
            iaai_search_url: env.iaai_search_url.clone(),
        }
    }

    pub async fn fetch_page(&self, target: &str) -> Result<String, FetchError> {
        let url = Url::parse_with_params(&self.proxy_base, &[("url", target)])
            .map_err(|e| FetchError::Url(e.to_string()))?;

        let res = self.client.get(url).send().await?;

        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }

        Ok(res.text().await?)
    }

    pub fn search_url(&self, source: Source, make: &str, model: Option<&str>) -> String {
        let query = match model {
            Some(m) => format!("{} {}", make, m),
            None => make.to_string(),
        };
        let (base, param) = match source {
            Source::Copart => (self.copart_search_url.as_str(), "query"),
            Source::Iaai => (self.iaai_search_url.as_str(), "Keyword"),
        };
        Url::parse_with_params(base, &[(param, query.as_str())])
            .map(String::from)
            .unwrap_or_else(|_| base.to_string())
    }
}

/// HTML-scrape strategy entry point: fetch the search page and extract rows.
/// Fails the attempt when fewer than one listing comes out.
pub async fn fetch_listings(
    fetcher: &PageFetcher,
    source: Source,
    make: &str,
    model: Option<&str>,
) -> Result<Vec<RawListing>, FetchError> {
    let url = fetcher.search_url(source, make, model);
    let html = fetcher.fetch_page(&url).await?;

    let listings = match source {
        Source::Copart => parse_copart_search(&html),
        Source::Iaai => parse_iaai_search(&html),
    };

    if listings.is_empty() {
        return Err(FetchError::NoListings);
    }
    Ok(listings)
}

/// One way of pulling a field value out of a listing row. Candidates run in
/// order; the first non-empty result wins. Markup on these pages changes
/// without notice, so every field carries several candidates.
pub enum Extractor {
    /// Inner text of the first element matching the selector.
    Text(&'static str),
    /// Attribute of the first element matching the selector.
    Attr(&'static str, &'static str),
    /// First capture group of the pattern, run against the row's raw HTML.
    Pattern(&'static str),
}

pub fn first_match(row: ElementRef<'_>, raw: &str, candidates: &[Extractor]) -> Option<String> {
    for candidate in candidates {
        let value = match candidate {
            Extractor::Text(sel) => Selector::parse(sel).ok().and_then(|sel| {
                row.select(&sel)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
            }),
            Extractor::Attr(sel, attr) => Selector::parse(sel).ok().and_then(|sel| {
                row.select(&sel)
                    .next()
                    .and_then(|el| el.value().attr(attr))
                    .map(|v| v.trim().to_string())
            }),
            Extractor::Pattern(pattern) => Regex::new(pattern).ok().and_then(|re| {
                re.captures(raw)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
            }),
        };
        if let Some(v) = value {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

fn select_rows<'a>(doc: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for sel in selectors {
        if let Ok(sel) = Selector::parse(sel) {
            let rows: Vec<ElementRef> = doc.select(&sel).collect();
            if !rows.is_empty() {
                return rows;
            }
        }
    }
    Vec::new()
}

pub fn parse_copart_search(html: &str) -> Vec<RawListing> {
    let doc = Html::parse_document(html);
    let rows = select_rows(
        &doc,
        &["tr[data-lotnumber]", "div.search-result-row", "table.search-results tbody tr"],
    );

    rows.iter()
        .filter_map(|row| {
            let raw = row.html();

            // No lot, no listing.
            let lot = first_match(
                *row,
                &raw,
                &[
                    Extractor::Text("a.lot-number"),
                    Extractor::Pattern(r#"data-lotnumber="(\d+)""#),
                    Extractor::Pattern(r"/lot/(\d+)"),
                ],
            )?;

            Some(RawListing {
                link: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Attr("a.search-results-title", "href"),
                        Extractor::Attr("a[href*='/lot/']", "href"),
                    ],
                )
                .map(|href| absolutize("https://www.copart.com", &href)),
                lot: Some(lot),
                title: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("a.search-results-title"),
                        Extractor::Text("h4.title"),
                    ],
                ),
                damage_type: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.lot-damage"),
                        Extractor::Pattern(r"Damage:\s*([A-Za-z/ ]+)<"),
                    ],
                ),
                odometer: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.lot-odometer"),
                        Extractor::Pattern(r"([\d,]+)\s*mi"),
                    ],
                ),
                current_bid: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.bid-price"),
                        Extractor::Pattern(r"\$([\d,]+)"),
                    ],
                ),
                image_url: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Attr("img.lot-image", "src"),
                        Extractor::Attr("img", "data-src"),
                        Extractor::Attr("img", "src"),
                    ],
                ),
                ..Default::default()
            })
        })
        .collect()
}

pub fn parse_iaai_search(html: &str) -> Vec<RawListing> {
    let doc = Html::parse_document(html);
    let rows = select_rows(
        &doc,
        &["div.table-row[data-stocknumber]", "div.vehicle-card", "li.search-result"],
    );

    rows.iter()
        .filter_map(|row| {
            let raw = row.html();

            let lot = first_match(
                *row,
                &raw,
                &[
                    Extractor::Text("span.stock-number"),
                    Extractor::Pattern(r#"data-stocknumber="(\d+)""#),
                    Extractor::Pattern(r"Stock\s*#?:?\s*(\d+)"),
                ],
            )?;

            Some(RawListing {
                link: first_match(
                    *row,
                    &raw,
                    &[Extractor::Attr("a[href*='VehicleDetail']", "href")],
                )
                .map(|href| absolutize("https://www.iaai.com", &href)),
                lot: Some(lot),
                title: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("h4.heading"),
                        Extractor::Text("a.vehicle-title"),
                    ],
                ),
                damage_type: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.damage"),
                        Extractor::Pattern(r"Primary Damage:?\s*([A-Za-z/ ]+)<"),
                    ],
                ),
                odometer: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.odometer"),
                        Extractor::Pattern(r"([\d,]+)\s*(?:mi|miles)"),
                    ],
                ),
                current_bid: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Text("span.current-bid"),
                        Extractor::Pattern(r"\$([\d,]+)"),
                    ],
                ),
                // Raw row HTML is entity-escaped, hence the &amp; variant.
                driveable: first_match(
                    *row,
                    &raw,
                    &[Extractor::Pattern(r"(Run\s*(?:&amp;|&)\s*Drive)")],
                ),
                image_url: first_match(
                    *row,
                    &raw,
                    &[
                        Extractor::Attr("img.vehicle-image", "src"),
                        Extractor::Attr("img", "src"),
                    ],
                ),
                ..Default::default()
            })
        })
        .collect()
}

fn absolutize(domain: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", domain, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COPART_FIXTURE: &str = r#"
        <table class="search-results"><tbody>
        <tr data-lotnumber="54821990">
            <td><a class="search-results-title" href="/lot/54821990">2021 TESLA MODEL 3</a></td>
            <td><span class="lot-damage">Front End</span></td>
            <td><span class="lot-odometer">31,250 mi</span></td>
            <td><span class="bid-price">$8,250</span></td>
            <td><img class="lot-image" src="https://cs.copart.com/v1/54821990.jpg"></td>
        </tr>
        <tr data-lotnumber="61034412">
            <td><a class="search-results-title" href="/lot/61034412">2019 TESLA MODEL S</a></td>
            <td><span class="bid-price">$14,100</span></td>
        </tr>
        </tbody></table>
    "#;

    const IAAI_FIXTURE: &str = r#"
        <div class="table-row" data-stocknumber="29184077">
            <a class="vehicle-title" href="/VehicleDetail/29184077~US">2022 Tesla Model Y</a>
            <span class="damage">Rear End</span>
            <span class="odometer">18,400 mi</span>
            <span class="current-bid">$11,500</span>
            Run &amp; Drive
        </div>
    "#;

    #[test]
    fn test_copart_rows_extracted() {
        let listings = parse_copart_search(COPART_FIXTURE);
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.lot.as_deref(), Some("54821990"));
        assert_eq!(first.title.as_deref(), Some("2021 TESLA MODEL 3"));
        assert_eq!(first.damage_type.as_deref(), Some("Front End"));
        assert_eq!(first.odometer.as_deref(), Some("31,250 mi"));
        assert_eq!(first.current_bid.as_deref(), Some("$8,250"));
        assert_eq!(
            first.link.as_deref(),
            Some("https://www.copart.com/lot/54821990")
        );
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://cs.copart.com/v1/54821990.jpg")
        );
    }

    #[test]
    fn test_copart_partial_row_still_usable() {
        let listings = parse_copart_search(COPART_FIXTURE);
        let second = &listings[1];
        assert_eq!(second.lot.as_deref(), Some("61034412"));
        // No odometer/damage markup in the row: fields stay unset for the
        // normalizer to default.
        assert!(second.odometer.is_none());
        assert!(second.damage_type.is_none());
    }

    #[test]
    fn test_iaai_rows_extracted() {
        let listings = parse_iaai_search(IAAI_FIXTURE);
        assert_eq!(listings.len(), 1);

        let l = &listings[0];
        assert_eq!(l.lot.as_deref(), Some("29184077"));
        assert_eq!(l.title.as_deref(), Some("2022 Tesla Model Y"));
        let driveable = l.driveable.as_deref().unwrap();
        assert_eq!(
            crate::data::types::YesNoUnknown::from_text(driveable),
            crate::data::types::YesNoUnknown::Yes
        );
        assert_eq!(
            l.link.as_deref(),
            Some("https://www.iaai.com/VehicleDetail/29184077~US")
        );
    }

    #[test]
    fn test_unrecognized_markup_yields_nothing() {
        assert!(parse_copart_search("<html><body><p>maintenance</p></body></html>").is_empty());
        assert!(parse_iaai_search("").is_empty());
    }

    #[test]
    fn test_first_match_candidate_order() {
        let doc = Html::parse_fragment(
            r#"<div><span class="a">first</span><span class="b">second</span></div>"#,
        );
        let sel = Selector::parse("div").unwrap();
        let row = doc.select(&sel).next().unwrap();
        let raw = row.html();

        // Missing first candidate falls through to the second.
        let v = first_match(
            row,
            &raw,
            &[Extractor::Text("span.missing"), Extractor::Text("span.b")],
        );
        assert_eq!(v.as_deref(), Some("second"));

        // First non-empty wins even when later candidates also match.
        let v = first_match(
            row,
            &raw,
            &[Extractor::Text("span.a"), Extractor::Text("span.b")],
        );
        assert_eq!(v.as_deref(), Some("first"));
    }
}
