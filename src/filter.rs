//! Turns the loosely-typed inputs of the article listing's filter form into a
//! [`FilterDirectiveSet`] for the CMS's article collection query.
//!
//! Ingestion happens in two steps. [`RawFilterInput`] holds the untrusted
//! request values exactly as received. [`FilterInput`] is the validated form:
//! the search term is trimmed, the author sentinel (`all`) is converted into
//! [`AuthorFilter::All`], and the date is parsed into a [`NaiveDate`] or
//! dropped. Nothing invalid gets past the second step, so [`build`] never has
//! to decide between emitting a half-formed directive and failing.
//!
//! Date ranges are expressed in UTC and are closed on both ends:
//! `[D 00:00:00.000, D 23:59:59.999]`, sent to the CMS with the JSON:API
//! `BETWEEN` operator.

use crate::params::Params;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use url::form_urlencoded;

/// The JSON:API resource type queried by the listing page.
pub const ARTICLE_TYPE: &str = "node--article";

/// The article fields projected by the listing page, in request order.
pub const ARTICLE_FIELDS: &[&str] = &["title", "path", "field_image", "uid", "created", "body"];

/// The relations resolved alongside each article, in request order.
pub const ARTICLE_INCLUDES: &[&str] = &["field_image", "uid"];

/// The author select's "no filter" option value.
const ALL_AUTHORS: &str = "all";

/// Query-string keys read by [`RawFilterInput::from_query`].
const SEARCH_KEY: &str = "search";
const AUTHOR_KEY: &str = "author";
const DATE_KEY: &str = "date";

/// Filter values exactly as they arrive from the request. Any field may be
/// missing, empty, or garbage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFilterInput {
    pub search_term: Option<String>,
    pub author_id: Option<String>,
    pub date_string: Option<String>,
}

impl RawFilterInput {
    /// Reads `search`, `author` and `date` from a URL query string (without
    /// the leading `?`). Keys may repeat: the filter form submits `date`
    /// twice, once from the picker and once as the echoed current value. The
    /// first non-empty occurrence of each key wins.
    pub fn from_query(query: &str) -> RawFilterInput {
        let mut input = RawFilterInput::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.trim().is_empty() {
                continue;
            }
            let slot = match &*key {
                SEARCH_KEY => &mut input.search_term,
                AUTHOR_KEY => &mut input.author_id,
                DATE_KEY => &mut input.date_string,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        input
    }
}

/// The author half of the filter: either every author or one specific author
/// id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorFilter {
    All,
    Specific(String),
}

impl AuthorFilter {
    /// Converts the raw select value. Missing, empty, and the `all` sentinel
    /// all mean [`AuthorFilter::All`].
    pub fn from_param(raw: Option<&str>) -> AuthorFilter {
        match raw.map(str::trim) {
            None | Some("") | Some(ALL_AUTHORS) => AuthorFilter::All,
            Some(id) => AuthorFilter::Specific(id.to_owned()),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            AuthorFilter::All => None,
            AuthorFilter::Specific(id) => Some(id),
        }
    }
}

impl Default for AuthorFilter {
    fn default() -> Self {
        AuthorFilter::All
    }
}

/// Parses a user-supplied calendar date. Accepts `YYYY-MM-DD` and full
/// RFC 3339 timestamps (as produced by the date picker); a timestamp
/// contributes the calendar date in its own offset. Anything else, including
/// out-of-range dates like `2024-02-30`, is `None`.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_plain_date(raw) {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    }
    let timestamp = DateTime::parse_from_rfc3339(raw).ok()?;
    if !raw.get(..10).map_or(false, is_plain_date) {
        return None;
    }
    Some(timestamp.naive_local().date())
}

// Exactly `YYYY-MM-DD` in ASCII digits. chrono alone would also take signed
// years and unpadded fields.
fn is_plain_date(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// A closed range covering one UTC calendar day, from its first to its last
/// millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    pub fn for_date(date: NaiveDate) -> Option<DayRange> {
        Some(DayRange {
            start: date.and_hms_milli_opt(0, 0, 0, 0)?.and_utc(),
            end: date.and_hms_milli_opt(23, 59, 59, 999)?.and_utc(),
        })
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Validated filter input. Every field is either meaningful or absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub search: Option<String>,
    pub author: AuthorFilter,
    pub date: Option<NaiveDate>,
}

impl From<&RawFilterInput> for FilterInput {
    fn from(raw: &RawFilterInput) -> FilterInput {
        FilterInput {
            search: raw
                .search_term
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_owned),
            author: AuthorFilter::from_param(raw.author_id.as_deref()),
            date: raw.date_string.as_deref().and_then(parse_calendar_date),
        }
    }
}

/// The sort order of the listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    CreatedDescending,
}

impl SortKey {
    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::CreatedDescending => "-created",
        }
    }
}

/// The directives sent with the article collection query. The first four
/// fields never vary; the optional ones are present only for valid input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterDirectiveSet {
    /// Only published articles are queryable.
    pub status: bool,
    pub field_selection: &'static [&'static str],
    pub include_relations: &'static [&'static str],
    pub sort: SortKey,

    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    pub author_equals: Option<String>,
    pub created_between: Option<DayRange>,
}

impl FilterDirectiveSet {
    /// The directives every listing query carries.
    pub fn fixed() -> FilterDirectiveSet {
        FilterDirectiveSet {
            status: true,
            field_selection: ARTICLE_FIELDS,
            include_relations: ARTICLE_INCLUDES,
            sort: SortKey::CreatedDescending,
            title_contains: None,
            author_equals: None,
            created_between: None,
        }
    }

    /// Renders the directives as JSON:API query parameters.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new()
            .with("filter[status]", if self.status { "1" } else { "0" })
            .with(
                format!("fields[{}]", ARTICLE_TYPE),
                self.field_selection.join(","),
            )
            .with("include", self.include_relations.join(","))
            .with("sort", self.sort.as_param());

        if let Some(term) = &self.title_contains {
            params.push("filter[title][operator]", "CONTAINS");
            params.push("filter[title][value]", term.as_str());
        }

        if let Some(author) = &self.author_equals {
            params.push("filter[uid.id]", author.as_str());
        }

        if let Some(range) = &self.created_between {
            params.push("filter[created-range][condition][path]", "created");
            params.push("filter[created-range][condition][operator]", "BETWEEN");
            params.push("filter[created-range][condition][value][0]", range.start_param());
            params.push("filter[created-range][condition][value][1]", range.end_param());
        }

        params
    }
}

/// Builds the directive set for one listing request. Never fails: invalid
/// input simply contributes no directive.
pub fn build(raw: &RawFilterInput) -> FilterDirectiveSet {
    build_from(&FilterInput::from(raw))
}

/// Builds the directive set from already-validated input.
pub fn build_from(input: &FilterInput) -> FilterDirectiveSet {
    FilterDirectiveSet {
        title_contains: input.search.clone(),
        author_equals: input.author.id().map(str::to_owned),
        created_between: input.date.and_then(DayRange::for_date),
        ..FilterDirectiveSet::fixed()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn raw(search: &str, author: &str, date: &str) -> RawFilterInput {
        let some = |s: &str| Some(s.to_owned());
        RawFilterInput {
            search_term: some(search),
            author_id: some(author),
            date_string: some(date),
        }
    }

    fn assert_fixed(set: &FilterDirectiveSet) {
        assert!(set.status);
        assert_eq!(ARTICLE_FIELDS, set.field_selection);
        assert_eq!(ARTICLE_INCLUDES, set.include_relations);
        assert_eq!(SortKey::CreatedDescending, set.sort);
    }

    #[test]
    fn test_empty_input_yields_only_fixed_directives() {
        for input in &[raw("", "", ""), RawFilterInput::default()] {
            let set = build(input);
            assert_eq!(FilterDirectiveSet::fixed(), set);
            assert_fixed(&set);
        }
    }

    #[test]
    fn test_whitespace_search_is_absent() {
        let set = build(&raw("   \t", "", ""));
        assert_eq!(None, set.title_contains);
    }

    #[test]
    fn test_search_is_trimmed() {
        assert_eq!(Some("rust".to_owned()), build(&raw("rust", "", "")).title_contains);
        assert_eq!(Some("rust".to_owned()), build(&raw("  rust ", "", "")).title_contains);
    }

    #[test]
    fn test_author_sentinel_is_absent() {
        assert_eq!(None, build(&raw("", "all", "")).author_equals);
        assert_eq!(Some("42".to_owned()), build(&raw("", "42", "")).author_equals);
    }

    #[test]
    fn test_author_filter_from_param() {
        assert_eq!(AuthorFilter::All, AuthorFilter::from_param(None));
        assert_eq!(AuthorFilter::All, AuthorFilter::from_param(Some("")));
        assert_eq!(AuthorFilter::All, AuthorFilter::from_param(Some("all")));
        assert_eq!(
            AuthorFilter::Specific("9b1c".to_owned()),
            AuthorFilter::from_param(Some("9b1c"))
        );
    }

    #[test]
    fn test_date_spans_the_whole_day() {
        let range = build(&raw("", "", "2024-03-15"))
            .created_between
            .expect("valid date should yield a range");
        assert_eq!("2024-03-15T00:00:00.000Z", range.start_param());
        assert_eq!("2024-03-15T23:59:59.999Z", range.end_param());
    }

    #[test]
    fn test_invalid_dates_are_absent() {
        for date in &[
            "not-a-date",
            "2024-02-30",
            "2024/03/15",
            "15-03-2024",
            " ",
            "-0001-01-01",
            "+2024-03-15",
            "2024-3-5",
            "02024-03-15",
            "2024-03-15x",
            "+2024-03-15T00:00:00Z",
        ] {
            let set = build(&raw("", "", date));
            assert_eq!(None, set.created_between, "date {:?}", date);
            assert_fixed(&set);
        }
    }

    #[test]
    fn test_picker_timestamp_uses_its_own_calendar_date() {
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 3, 14),
            parse_calendar_date("2024-03-14T23:00:00.000Z")
        );
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 3, 15),
            parse_calendar_date("2024-03-15T00:30:00+02:00")
        );
    }

    #[test]
    fn test_fixed_directives_survive_every_input() {
        let inputs = [
            raw("rust", "42", "2024-03-15"),
            raw(" ", "all", "nope"),
            raw("ünïcödé", "", "2000-01-01"),
        ];
        for input in inputs.iter() {
            assert_fixed(&build(input));
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let input = raw("rust", "42", "2024-03-15");
        assert_eq!(build(&input), build(&input));
    }

    #[test]
    fn test_from_query_takes_first_non_empty_value() {
        let input = RawFilterInput::from_query(
            "search=rust+lang&author=&author=42&date=2024-03-14T23%3A00%3A00.000Z&date=2024-01-01&page=2",
        );
        assert_eq!(Some("rust lang"), input.search_term.as_deref());
        assert_eq!(Some("42"), input.author_id.as_deref());
        assert_eq!(Some("2024-03-14T23:00:00.000Z"), input.date_string.as_deref());
    }

    #[test]
    fn test_to_params_fixed_only() {
        let params = FilterDirectiveSet::fixed().to_params();
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(
            vec![
                ("filter[status]", "1"),
                ("fields[node--article]", "title,path,field_image,uid,created,body"),
                ("include", "field_image,uid"),
                ("sort", "-created"),
            ],
            pairs
        );
    }

    #[test]
    fn test_to_params_with_every_conditional_directive() {
        let params = build(&raw("rust", "42", "2024-03-15")).to_params();
        assert_eq!(Some("CONTAINS"), params.get("filter[title][operator]"));
        assert_eq!(Some("rust"), params.get("filter[title][value]"));
        assert_eq!(Some("42"), params.get("filter[uid.id]"));
        assert_eq!(
            Some("BETWEEN"),
            params.get("filter[created-range][condition][operator]")
        );
        assert_eq!(
            Some("2024-03-15T00:00:00.000Z"),
            params.get("filter[created-range][condition][value][0]")
        );
        assert_eq!(
            Some("2024-03-15T23:59:59.999Z"),
            params.get("filter[created-range][condition][value][1]")
        );
        assert_eq!(11, params.len());
    }
}
