//! HTML + plain-text bodies for workshop and access-code emails.

use super::OutgoingEmail;

const REMINDER_1DAY_TEMPLATE: &str = include_str!("../../templates/reminder_1day.html");
const REMINDER_15MIN_TEMPLATE: &str = include_str!("../../templates/reminder_15min.html");
const WELCOME_TEMPLATE: &str = include_str!("../../templates/welcome.html");
const ACCESS_CODE_TEMPLATE: &str = include_str!("../../templates/access_code.html");

/// Values shared by the workshop emails.
#[derive(Debug, Clone)]
pub struct WorkshopEmail<'a> {
    pub app_name: &'a str,
    pub to_email: &'a str,
    pub to_name: &'a str,
    pub title: &'a str,
    /// Pre-formatted start time, e.g. `05 March 2027, 02:30 PM IST`.
    pub start_time: &'a str,
    pub description: Option<&'a str>,
    pub meeting_link: Option<&'a str>,
}

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn description_block(label: &str, description: Option<&str>) -> String {
    description
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("<p><strong>{label}:</strong> {}</p>", escape_html(d)))
        .unwrap_or_default()
}

fn fill_common(template: &str, ctx: &WorkshopEmail<'_>) -> String {
    template
        .replace("{{NAME}}", &escape_html(ctx.to_name))
        .replace("{{TITLE}}", &escape_html(ctx.title))
        .replace("{{START_TIME}}", &escape_html(ctx.start_time))
        .replace("{{APP_NAME}}", &escape_html(ctx.app_name))
}

#[must_use]
pub fn reminder_1day(ctx: &WorkshopEmail<'_>) -> OutgoingEmail {
    let html = fill_common(REMINDER_1DAY_TEMPLATE, ctx)
        .replace("{{DESCRIPTION_BLOCK}}", &description_block("Description", ctx.description));

    let mut text = format!(
        "Workshop Reminder: 1 Day to Go!\n\nHi {},\n\nThis is a friendly reminder that your workshop is starting tomorrow!\n\nWorkshop: {}\nStart Time: {}\n",
        ctx.to_name, ctx.title, ctx.start_time
    );
    if let Some(description) = ctx.description.filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!("Description: {description}\n"));
    }
    text.push_str(&format!("\nBest regards,\nTeam {}\n", ctx.app_name));

    OutgoingEmail { to: ctx.to_email.to_owned(), subject: format!("Workshop Tomorrow: {}", ctx.title), html, text }
}

#[must_use]
pub fn reminder_15min(ctx: &WorkshopEmail<'_>) -> OutgoingEmail {
    let link = ctx.meeting_link.filter(|l| !l.trim().is_empty());
    let join_block = link
        .map(|l| {
            format!(
                r#"<div style="text-align: center; margin: 25px 0;"><a href="{}" style="background-color: #059669; color: white; padding: 12px 30px; text-decoration: none; border-radius: 6px; font-weight: bold; display: inline-block;">Join Workshop Now</a></div>"#,
                escape_html(l)
            )
        })
        .unwrap_or_default();
    let html = fill_common(REMINDER_15MIN_TEMPLATE, ctx).replace("{{JOIN_BLOCK}}", &join_block);

    let mut text = format!(
        "Workshop Starting in 15 Minutes!\n\nHi {},\n\nYour workshop is starting in just 15 minutes!\n\nWorkshop: {}\n",
        ctx.to_name, ctx.title
    );
    if let Some(link) = link {
        text.push_str(&format!("Join Workshop: {link}\n"));
    }
    text.push_str(&format!("\nBest regards,\nTeam {}\n", ctx.app_name));

    OutgoingEmail { to: ctx.to_email.to_owned(), subject: format!("Starting NOW: {}", ctx.title), html, text }
}

#[must_use]
pub fn welcome(ctx: &WorkshopEmail<'_>) -> OutgoingEmail {
    let html = fill_common(WELCOME_TEMPLATE, ctx)
        .replace("{{DESCRIPTION_BLOCK}}", &description_block("About", ctx.description));

    let mut text = format!(
        "Workshop Enrollment Confirmed!\n\nHi {},\n\nYou've successfully enrolled in:\n\nWorkshop: {}\nStart Time: {}\n",
        ctx.to_name, ctx.title, ctx.start_time
    );
    if let Some(description) = ctx.description.filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!("About: {description}\n"));
    }
    text.push_str("\nYou'll receive a reminder 1 day before the workshop and another 15 minutes before it starts.\n");
    text.push_str(&format!("\nBest regards,\nTeam {}\n", ctx.app_name));

    OutgoingEmail { to: ctx.to_email.to_owned(), subject: format!("Welcome to {}!", ctx.title), html, text }
}

#[must_use]
pub fn access_code(app_name: &str, to_email: &str, code: &str) -> OutgoingEmail {
    let html = ACCESS_CODE_TEMPLATE
        .replace("{{APP_NAME}}", &escape_html(app_name))
        .replace("{{EMAIL}}", &escape_html(to_email))
        .replace("{{CODE}}", &escape_html(code));
    let text = format!("Your {app_name} access code is {code}. It expires in 10 minutes.\n");
    OutgoingEmail { to: to_email.to_owned(), subject: format!("Your {app_name} access code"), html, text }
}

#[cfg(test)]
#[path = "templates_test.rs"]
mod tests;
