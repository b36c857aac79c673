use super::*;

fn ctx<'a>(description: Option<&'a str>, meeting_link: Option<&'a str>) -> WorkshopEmail<'a> {
    WorkshopEmail {
        app_name: "Summer School",
        to_email: "asha@example.com",
        to_name: "Asha",
        title: "Intro to <Rust>",
        start_time: "05 March 2027, 02:30 PM IST",
        description,
        meeting_link,
    }
}

#[test]
fn escape_html_escapes_markup() {
    assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
}

#[test]
fn reminder_1day_subject_and_fields() {
    let email = reminder_1day(&ctx(Some("Ownership & borrowing"), None));
    assert_eq!(email.to, "asha@example.com");
    assert_eq!(email.subject, "Workshop Tomorrow: Intro to <Rust>");
    assert!(email.html.contains("Intro to &lt;Rust&gt;"));
    assert!(email.html.contains("05 March 2027, 02:30 PM IST"));
    assert!(email.html.contains("Ownership &amp; borrowing"));
    assert!(email.html.contains("Team Summer School"));
    assert!(!email.html.contains("{{"));
    assert!(email.text.contains("Description: Ownership & borrowing"));
}

#[test]
fn reminder_1day_omits_blank_description() {
    let email = reminder_1day(&ctx(Some("  "), None));
    assert!(!email.html.contains("Description:"));
    assert!(!email.text.contains("Description:"));
}

#[test]
fn reminder_15min_includes_join_button_only_with_link() {
    let with_link = reminder_15min(&ctx(None, Some("https://meet.example.com/abc")));
    assert_eq!(with_link.subject, "Starting NOW: Intro to <Rust>");
    assert!(with_link.html.contains(r#"href="https://meet.example.com/abc""#));
    assert!(with_link.text.contains("Join Workshop: https://meet.example.com/abc"));

    let without = reminder_15min(&ctx(None, None));
    assert!(!without.html.contains("Join Workshop Now"));
    assert!(!without.text.contains("Join Workshop:"));
    assert!(!without.html.contains("{{"));
}

#[test]
fn welcome_uses_about_label() {
    let email = welcome(&ctx(Some("Hands-on"), None));
    assert_eq!(email.subject, "Welcome to Intro to <Rust>!");
    assert!(email.html.contains("<strong>About:</strong> Hands-on"));
    assert!(email.text.contains("About: Hands-on"));
}

#[test]
fn access_code_renders_code_and_email() {
    let email = access_code("Summer School", "asha@example.com", "AB2CD3");
    assert_eq!(email.subject, "Your Summer School access code");
    assert!(email.html.contains("AB2CD3"));
    assert!(email.html.contains("asha@example.com"));
    assert!(email.text.contains("AB2CD3"));
}
