// Transactional email templates
//
// Every template renders the same card layout: a heading, a few paragraphs
// and a single call-to-action button linking back into the site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::event::Event;

/// A rendered email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub from_email: String,
    pub from_name: String,
    pub to_email: String,
    pub subject: String,
    pub html: String,
}

impl Email {
    fn new(site: &SiteConfig, to_email: &str, subject: String, html: String) -> Self {
        Self {
            from_email: site.from_email.clone(),
            from_name: site.from_name.clone(),
            to_email: to_email.to_string(),
            subject,
            html,
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Human readable event time, e.g. "Saturday, December 21, 2024 at 07:00 AM UTC"
pub fn format_event_time(instant: DateTime<Utc>) -> String {
    instant.format("%A, %B %-d, %Y at %I:%M %p UTC").to_string()
}

fn card(heading: &str, paragraphs: &[String], cta_href: &str, cta_label: &str) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!(r#"<p style="margin: 0 0 20px; font-size: 16px; line-height: 1.5; color: black;">{p}</p>"#))
        .collect();
    format!(
        concat!(
            "<!DOCTYPE html><html><body style=\"margin: 0; padding: 0; font-family: 'Arial', sans-serif;\">",
            "<table role=\"presentation\" style=\"max-width: 600px; margin: 20px auto; background-color: #C5FFE6; ",
            "border: 3px solid black; border-radius: 12px; box-shadow: 7px 7px 0 rgba(0,0,0,1);\">",
            "<tr><td style=\"padding: 30px;\">",
            "<h1 style=\"margin: 0 0 20px; font-size: 28px; font-weight: bold; color: black;\">{heading}</h1>",
            "{body}",
            "<div style=\"text-align: center;\"><a href=\"{href}\" style=\"display: inline-block; background-color: black; ",
            "color: white; padding: 24px 40px; text-decoration: none; border-radius: 4px; font-weight: bold; font-size: 16px;\">",
            "{label}</a></div>",
            "</td></tr></table></body></html>"
        ),
        heading = heading,
        body = body,
        href = cta_href,
        label = cta_label,
    )
}

/// Sent about a day before an event starts
pub fn event_reminder(
    site: &SiteConfig,
    to_email: &str,
    first_name: &str,
    event_id: i64,
    event_name: &str,
    location: Option<&str>,
    start_time: DateTime<Utc>,
) -> Email {
    let name = escape_html(first_name);
    let event = escape_html(event_name);
    let html = card(
        &format!("Hi {name}! 🎉"),
        &[
            format!("This is a friendly reminder that {event} is happening tomorrow!"),
            format!(
                "<strong>When:</strong> {}<br><strong>Where:</strong> {}",
                format_event_time(start_time),
                escape_html(location.unwrap_or("TBA"))
            ),
            "We're looking forward to seeing you there!".to_string(),
        ],
        &site.link(&format!("/events/{event_id}")),
        "View Event Details",
    );
    Email::new(site, to_email, format!("Reminder: {event_name} is tomorrow!"), html)
}

/// Sent shortly after an event ends, pointing at the attendee list
pub fn event_followup(
    site: &SiteConfig,
    to_email: &str,
    first_name: &str,
    event_id: i64,
    event_name: &str,
) -> Email {
    let name = escape_html(first_name);
    let event = escape_html(event_name);
    let html = card(
        &format!("Hi {name}! 👋"),
        &[
            format!("We hope you had a great time at {event}!"),
            "Made some connections? Want to stay in touch with the awesome people you met? \
             Check out who else attended and connect with them now!"
                .to_string(),
        ],
        &site.link(&format!("/events/{event_id}/participants")),
        "Reconnect with Attendees",
    );
    Email::new(
        site,
        to_email,
        format!("Reconnect with people you met at {event_name}!"),
        html,
    )
}

/// Digest of unread messages for one recipient
pub fn unread_messages(
    site: &SiteConfig,
    to_email: &str,
    first_name: &str,
    unique_senders: i64,
    sender_names: &[String],
) -> Email {
    let name = escape_html(first_name);
    let who = if unique_senders == 1 {
        "person has sent you a message"
    } else {
        "people have sent you messages"
    };
    let senders = sender_names
        .iter()
        .map(|s| escape_html(s))
        .collect::<Vec<_>>()
        .join(", ");
    let html = card(
        &format!("Hey {name}! 💌"),
        &[
            format!("<strong>You've got mail!</strong> {unique_senders} {who}."),
            format!("Messages waiting from:<br><strong>{senders}</strong>"),
        ],
        &site.link("/chats"),
        "Read Your Messages →",
    );
    Email::new(
        site,
        to_email,
        "New Messages Waiting for You on SocialSpot! 💌".to_string(),
        html,
    )
}

/// Confirmation after a successful registration
pub fn registration_confirmation(
    site: &SiteConfig,
    to_email: &str,
    first_name: &str,
    event: &Event,
) -> Email {
    let name = escape_html(first_name);
    let event_name = escape_html(&event.name);
    let html = card(
        &format!("Hi {name}! 🎉"),
        &[
            format!("You're all set for {event_name}!"),
            format!(
                "<strong>When:</strong> {}<br><strong>Where:</strong> {}",
                format_event_time(event.start_time),
                escape_html(event.location.as_deref().unwrap_or("TBA"))
            ),
            "We'll send you a reminder before the event. Get ready to meet some amazing people!"
                .to_string(),
        ],
        &site.link(&format!("/events/{}", event.event_id)),
        "View Event Details",
    );
    Email::new(
        site,
        to_email,
        format!("You're registered for {}! 🕺", event.name),
        html,
    )
}

/// Told to the requester once the other attendee accepts
pub fn connection_accepted(
    site: &SiteConfig,
    to_email: &str,
    connected_with: &str,
    event_name: &str,
) -> Email {
    let html = card(
        "You've Made a New Friend! 🎉",
        &[
            format!("<strong>Connected With:</strong> {}", escape_html(connected_with)),
            format!("<strong>Event:</strong> {}", escape_html(event_name)),
            "Someone you met at the event wants to stay in touch! Visit your connections page \
             to start chatting and plan future meetups."
                .to_string(),
        ],
        &site.link("/matches"),
        "View Your Connections",
    );
    Email::new(
        site,
        to_email,
        "New Friend Connection at SocialSpot! 🎉".to_string(),
        html,
    )
}

/// Moderation alert for a new user report
pub fn report_submitted(
    site: &SiteConfig,
    reported_by: &str,
    reported_user_id: &str,
    reason: &str,
) -> Email {
    let html = card(
        "New User Report",
        &[
            format!("<strong>Reporter ID:</strong> {}", escape_html(reported_by)),
            format!("<strong>Reported User ID:</strong> {}", escape_html(reported_user_id)),
            format!("<strong>Reason:</strong> {}", escape_html(reason)),
        ],
        &site.link("/"),
        "Open SocialSpot",
    );
    Email::new(
        site,
        &site.moderation_email,
        "New User Report Submitted".to_string(),
        html,
    )
}
