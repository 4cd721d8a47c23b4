//! Plain-text rendering for terminal output.

use std::fmt::Write;

use pharmaguard_core::{
    DisplayComment, HealthPost, LikeState, LikedPosts, Pharmacy, ScheduleNavigator,
};

/// The selected week, or an explicit "no active week" message.
#[must_use]
pub fn week(navigator: &ScheduleNavigator) -> String {
    let mut out = String::new();

    if navigator.is_empty() {
        out.push_str("No roster available.\n");
        return out;
    }

    let (Some(index), Some(week)) = (navigator.cursor(), navigator.current()) else {
        let _ = writeln!(out, "No roster covers the current week.");
        let _ = writeln!(
            out,
            "{} week(s) available; use --week or --next to browse.",
            navigator.len()
        );
        return out;
    };

    let _ = writeln!(
        out,
        "Week {}/{}: {}",
        index + 1,
        navigator.len(),
        week.label
    );
    for pharmacy in &week.pharmacies {
        pharmacy_lines(&mut out, pharmacy);
    }
    if week.pharmacies.is_empty() {
        out.push_str("  (no pharmacy listed)\n");
    }

    match (navigator.is_first(), navigator.is_last()) {
        (true, true) => {}
        (true, false) => out.push_str("(first week)\n"),
        (false, true) => out.push_str("(last week)\n"),
        (false, false) => {}
    }
    out
}

fn pharmacy_lines(out: &mut String, pharmacy: &Pharmacy) {
    let _ = writeln!(out, "  - {}", pharmacy.name);
    if !pharmacy.location.is_empty() {
        let _ = writeln!(out, "    {}", pharmacy.location);
    }
    let contacts: Vec<&str> = [&pharmacy.primary_contact, &pharmacy.secondary_contact]
        .into_iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect();
    if !contacts.is_empty() {
        let _ = writeln!(out, "    tel: {}", contacts.join(" / "));
    }
    if let Some((latitude, longitude)) = pharmacy.coordinates() {
        let _ = writeln!(out, "    gps: {latitude:.5}, {longitude:.5}");
    }
}

/// Post listing with like counts; `*` marks posts liked from this device.
#[must_use]
pub fn posts(posts: &[HealthPost], liked: &LikedPosts) -> String {
    if posts.is_empty() {
        return "No posts yet.\n".to_string();
    }

    let mut out = String::new();
    for post in posts {
        let marker = if liked.contains(post.id) { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "[{}] {} ({} like(s)){marker}",
            post.id, post.title, post.likes
        );
        let _ = writeln!(out, "    {}", post.created_at.format("%d/%m/%Y"));
    }
    out
}

#[must_use]
pub fn like_state(state: LikeState) -> String {
    if state.liked_by_me {
        format!("Liked ({} like(s))\n", state.likes)
    } else {
        format!("Like removed ({} like(s))\n", state.likes)
    }
}

/// Comments oldest first; unconfirmed ones are flagged.
#[must_use]
pub fn comments(comments: &[DisplayComment]) -> String {
    if comments.is_empty() {
        return "No comments yet.\n".to_string();
    }

    let mut out = String::new();
    for comment in comments {
        let status = if comment.confirmed { "" } else { " (sending)" };
        let _ = writeln!(
            out,
            "{}{status}\n  {}",
            comment.created_at.format("%d/%m/%Y %H:%M"),
            comment.body
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pharmaguard_core::{ActiveWeekResolver, PostId, WeekSchedule};

    use super::*;

    fn pharmacy(name: &str) -> Pharmacy {
        Pharmacy {
            name: name.to_string(),
            location: "Rue du Marché".to_string(),
            primary_contact: "0102030405".to_string(),
            secondary_contact: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    fn navigator(day: u32) -> ScheduleNavigator {
        let weeks = vec![
            WeekSchedule::new("01/01/24 au 07/01/24", vec![pharmacy("Pharmacie du Centre")]),
            WeekSchedule::new("08/01/24 au 14/01/24", vec![pharmacy("Pharmacie de la Gare")]),
        ];
        let now = NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        ScheduleNavigator::new(weeks, ActiveWeekResolver::default(), now)
    }

    #[test]
    fn test_week_shows_active_week() {
        let out = week(&navigator(3));
        assert!(out.starts_with("Week 1/2: 01/01/24 au 07/01/24"));
        assert!(out.contains("Pharmacie du Centre"));
        assert!(out.contains("tel: 0102030405\n"));
        assert!(out.contains("(first week)"));
    }

    #[test]
    fn test_week_shows_coordinates_when_known() {
        let located = Pharmacy {
            latitude: Some(12.371_4),
            longitude: Some(-1.519_7),
            ..pharmacy("Pharmacie du Lac")
        };
        let nav = ScheduleNavigator::new(
            vec![WeekSchedule::new("01/01/24 au 07/01/24", vec![located])],
            ActiveWeekResolver::default(),
            NaiveDate::from_ymd_opt(2024, 1, 3)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap_or_default(),
        );
        let out = week(&nav);
        assert!(out.contains("    gps: 12.37140, -1.51970\n"), "{out}");
        assert!(!week(&navigator(3)).contains("gps:"));
    }

    #[test]
    fn test_week_without_active_week() {
        let out = week(&navigator(20));
        assert!(out.contains("No roster covers the current week."));
        assert!(!out.contains("Pharmacie"));
    }

    #[test]
    fn test_posts_mark_liked() {
        let post = HealthPost {
            id: PostId::new(3),
            title: "Canicule".to_string(),
            body: String::new(),
            image_url: None,
            created_at: chrono::Utc::now(),
            publish_at: None,
            likes: 2,
        };
        let mut liked = LikedPosts::default();
        liked.set(PostId::new(3), true);
        assert!(posts(&[post], &liked).starts_with("[3] Canicule (2 like(s))*"));
    }
}
