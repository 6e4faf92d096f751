//! Price alert e-mail bodies.

use askama::Template;
use cryptodash_core::services::PriceAlertNotice;

use crate::error::Result;

#[derive(Template)]
#[template(
    source = r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f4f4f4;">
        <div style="background-color: #1e293b; color: white; padding: 20px; border-radius: 10px 10px 0 0;">
            <h2 style="margin: 0;">🔔 Предупредување за цена</h2>
        </div>
        <div style="background-color: white; padding: 30px; border-radius: 0 0 10px 10px;">
            <p style="font-size: 16px;">Здраво,</p>
            <p style="font-size: 16px;">Вашето предупредување за цена е активирано!</p>

            <div style="background-color: #f0f9ff; border-left: 4px solid #3b82f6; padding: 15px; margin: 20px 0;">
                <p style="margin: 5px 0;"><strong>Криптовалута:</strong> {{ crypto }} ({{ symbol }})</p>
                <p style="margin: 5px 0;"><strong>Услов:</strong> Цена {{ condition_text }} {{ target_price }}</p>
                <p style="margin: 5px 0;"><strong>Тековна цена:</strong> <span style="color: #3b82f6; font-size: 18px; font-weight: bold;">{{ current_price }}</span></p>
            </div>

            <p style="font-size: 14px; color: #666;">Ова е автоматска нотификација од вашата Crypto Dashboard апликација.</p>

            <p style="margin-top: 30px;">Поздрав,<br><strong>Crypto Dashboard Тим</strong></p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct AlertEmailHtml<'a> {
    pub crypto: &'a str,
    pub symbol: &'a str,
    pub condition_text: &'a str,
    pub target_price: String,
    pub current_price: String,
}

#[derive(Template)]
#[template(
    source = r#"Здраво,

Вашето предупредување за цена е активирано!

Криптовалута: {{ crypto }} ({{ symbol }})
Услов: Цена {{ condition_text }} {{ target_price }}
Тековна цена: {{ current_price }}

Ова е автоматска нотификација од вашата Crypto Dashboard апликација.

Поздрав,
Crypto Dashboard Тим
"#,
    ext = "txt"
)]
pub struct AlertEmailText<'a> {
    pub crypto: &'a str,
    pub symbol: &'a str,
    pub condition_text: &'a str,
    pub target_price: String,
    pub current_price: String,
}

/// A rendered alert e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl AlertEmail {
    pub fn render(notice: &PriceAlertNotice) -> Result<Self> {
        let condition_text = if notice.is_above() { "над" } else { "под" };

        let html = AlertEmailHtml {
            crypto: &notice.crypto,
            symbol: &notice.symbol,
            condition_text,
            target_price: format_usd(notice.target_price),
            current_price: format_usd(notice.current_price),
        }
        .render()?;

        let text = AlertEmailText {
            crypto: &notice.crypto,
            symbol: &notice.symbol,
            condition_text,
            target_price: format_usd(notice.target_price),
            current_price: format_usd(notice.current_price),
        }
        .render()?;

        Ok(Self {
            subject: format!(
                "🔔 Предупредување за цена: {} ({})",
                notice.crypto, notice.symbol
            ),
            html,
            text,
        })
    }
}

/// `$` followed by the amount with thousands separators and two decimals,
/// e.g. `$1,234.56`. Negative amounts render as `$-1,234.56`.
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${sign}{grouped}.{fraction}")
}
