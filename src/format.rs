//! Locale-aware price and number formatting.
//!
//! Storefront templates receive prices both as numbers and as already
//! formatted strings (`"$1,299.00"`, `"1 299,00 $"`). [`Accounting`] turns
//! either form into a display string or back into a number ready for
//! arithmetic, following the page locale from the CSP data:
//!
//! | Locale  | Price        | Negative      | Number     |
//! |---------|--------------|---------------|------------|
//! | default | `$4,444.98`  | `$ (4,444.98)`| `4,444.98` |
//! | `fr_FR` | `4 444,98 $` | `(4 444,98) $`| `4 444,98` |
//!
//! Values are rounded half away from zero at the configured precision before
//! they are grouped.

/// Locale that switches to French separators and symbol placement.
pub const FRENCH_LOCALE: &str = "fr_FR";

/// A price or quantity as it arrives from a template or a form.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    /// A plain number
    Number(f64),
    /// A possibly formatted string such as `"$1,299.00"` or `"(5.00)"`
    Text(String),
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        // Prices never come close to 2^53.
        Self::Number(value as f64)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Amount {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Separators and precision for plain numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    /// Decimal places
    pub precision: usize,
    /// Thousands separator
    pub thousand: String,
    /// Decimal separator
    pub decimal: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            precision: 2,
            thousand: ",".to_string(),
            decimal: '.',
        }
    }
}

/// Currency symbol placement and separators.
///
/// The `positive`, `negative` and `zero` patterns use `%s` for the symbol and
/// `%v` for the formatted absolute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    /// Currency symbol
    pub symbol: String,
    /// Pattern for values above zero
    pub positive: String,
    /// Pattern for values below zero
    pub negative: String,
    /// Pattern for zero
    pub zero: String,
    /// Separators and precision of `%v`
    pub number: NumberFormat,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            positive: "%s%v".to_string(),
            negative: "%s (%v)".to_string(),
            zero: "%s0.00".to_string(),
            number: NumberFormat::default(),
        }
    }
}

/// Price and number formatting settings for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accounting {
    /// Settings used by [`Accounting::format_money`]
    pub currency: CurrencyFormat,
    /// Settings used by [`Accounting::format_number`] and parsing
    pub number: NumberFormat,
}

impl Accounting {
    /// Settings for `locale`; anything but `fr_FR` gets the defaults.
    pub fn for_locale(locale: Option<&str>) -> Self {
        let mut accounting = Self::default();

        if locale == Some(FRENCH_LOCALE) {
            accounting.currency.positive = "%v %s".to_string();
            accounting.currency.negative = "(%v) %s".to_string();
            accounting.currency.zero = "0,00 %s".to_string();
            for number in [&mut accounting.currency.number, &mut accounting.number] {
                number.decimal = ',';
                number.thousand = " ".to_string();
            }
        }

        accounting
    }

    /// Format a price, e.g. `4444.97777` -> `$4,444.98`.
    pub fn format_money(&self, price: impl Into<Amount>) -> String {
        let value = self.unformat(&price.into());
        let currency = &self.currency;
        let pattern = if value > 0.0 {
            &currency.positive
        } else if value < 0.0 {
            &currency.negative
        } else {
            &currency.zero
        };

        pattern
            .replace("%s", &currency.symbol)
            .replace("%v", &group(value.abs(), &currency.number))
    }

    /// Format a number, e.g. `"4444.98"` -> `4,444.98`.
    pub fn format_number(&self, value: impl Into<Amount>) -> String {
        group(self.unformat(&value.into()), &self.number)
    }

    /// Parse an amount back into a number.
    ///
    /// Text loses everything but digits, `-` and the locale's decimal
    /// separator; a parenthesized value is negative. Unparseable text is `0`.
    pub fn unformat(&self, amount: &Amount) -> f64 {
        match amount {
            Amount::Number(value) if value.is_finite() => *value,
            Amount::Number(_) => 0.0,
            Amount::Text(text) => unformat_text(text, self.number.decimal),
        }
    }

    /// A number ready for arithmetic, rounded to the number precision.
    ///
    /// `"$4,444.97777"` and `4444.97777` both give `4444.98`.
    pub fn price_as_number(&self, price: impl Into<Amount>) -> f64 {
        round_to(self.unformat(&price.into()), self.number.precision)
    }

    /// Sum of several prices, each rounded before adding.
    pub fn subtotal_from_base_prices<I, A>(&self, prices: I) -> f64
    where
        I: IntoIterator<Item = A>,
        A: Into<Amount>,
    {
        let sum = prices.into_iter().map(|price| self.price_as_number(price)).sum::<f64>();
        round_to(sum, self.number.precision)
    }

    /// Total of `quantity` units at `unit_price`.
    pub fn subtotal_from_quantity(&self, unit_price: impl Into<Amount>, quantity: u32) -> f64 {
        round_to(self.price_as_number(unit_price) * f64::from(quantity), self.number.precision)
    }
}

fn round_to(value: f64, precision: usize) -> f64 {
    let power = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    (value * power).round() / power
}

fn group(value: f64, format: &NumberFormat) -> String {
    let fixed = format!("{:.*}", format.precision, round_to(value.abs(), format.precision));
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut out = String::with_capacity(fixed.len() + integer.len() / 3 * format.thousand.len() + 1);
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push_str(&format.thousand);
        }
        out.push(digit);
    }
    if !fraction.is_empty() {
        out.push(format.decimal);
        out.push_str(fraction);
    }
    out
}

fn unformat_text(text: &str, decimal: char) -> f64 {
    let trimmed = text.trim();
    let negative_parens = trimmed.find('(').is_some_and(|open| {
        let rest = &trimmed[open + 1..];
        rest.starts_with(|c: char| c.is_ascii_digit()) && rest.contains(')')
    });

    let mut cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == decimal)
        .map(|c| if c == decimal { '.' } else { c })
        .collect();
    if negative_parens && !cleaned.starts_with('-') {
        cleaned.insert(0, '-');
    }

    leading_float(&cleaned).unwrap_or(0.0)
}

/// Parse the longest numeric prefix, the way a lenient float reader does.
fn leading_float(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    text[..end].trim_end_matches('.').parse().ok()
}
