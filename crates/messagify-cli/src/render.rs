//! Plain-text rendering of the channel tree and conversations.

use std::fmt::Write;

use messagify_shared::{Channel, Guild, Message};
use messagify_sync::{ChannelTree, ViewState};

fn leaf_line(out: &mut String, channel: &Channel, indent: &str) {
    let prefix = if channel.kind.is_direct() { "@" } else { "#" };
    let _ = writeln!(out, "{indent}{prefix} {} ({})", channel.name, channel.id);
}

/// Uncategorized leaves first, then each category. Collapsed categories
/// show only their header.
pub fn render_tree(tree: &ChannelTree, view: &ViewState) -> String {
    let mut out = String::new();

    for channel in &tree.uncategorized {
        leaf_line(&mut out, channel, "");
    }

    for node in &tree.categories {
        let expanded = view.expanded.contains(&node.category.id);
        let marker = if expanded { "v" } else { ">" };
        let _ = writeln!(
            out,
            "{marker} {} ({})",
            node.category.name.to_uppercase(),
            node.children.len()
        );
        if expanded {
            for channel in &node.children {
                leaf_line(&mut out, channel, "    ");
            }
        }
    }

    if out.is_empty() {
        out.push_str("(no channels)\n");
    }
    out
}

/// Groups in the order the API returned them, with the id to pass as
/// `MESSAGIFY_GROUP_ID`.
pub fn render_groups(groups: &[Guild]) -> String {
    let mut out = String::from("Groups:\n");
    if groups.is_empty() {
        out.push_str("  (none)\n");
    }
    for group in groups {
        let _ = writeln!(out, "  {} ({})", group.name, group.id);
    }
    out
}

/// Messages oldest first, one per line.
pub fn render_messages(messages: &[Message]) -> String {
    let mut out = String::new();

    for message in messages.iter().rev() {
        let _ = write!(
            out,
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.author.display_name(),
            message.content
        );
        if message.is_edited() {
            out.push_str(" (edited)");
        }
        out.push('\n');
    }

    if out.is_empty() {
        out.push_str("(no messages)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use messagify_shared::{Author, ChannelId, ChannelKind, GroupId, MessageId};
    use messagify_sync::CategoryNode;

    fn channel(id: &str, kind: ChannelKind) -> Channel {
        Channel {
            id: ChannelId::from(id),
            name: id.to_string(),
            kind,
            position: 0,
            parent_id: None,
        }
    }

    fn message(id: &str, minute: u32, content: &str) -> Message {
        Message {
            id: MessageId::from(id),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap(),
            edited_timestamp: None,
            author: Author {
                id: "u1".into(),
                username: "alice".into(),
                global_name: Some("Alice".into()),
                avatar: None,
            },
        }
    }

    fn sample_tree() -> ChannelTree {
        ChannelTree {
            uncategorized: vec![channel("dm", ChannelKind::Dm)],
            categories: vec![CategoryNode {
                category: channel("text", ChannelKind::GuildCategory),
                children: vec![channel("general", ChannelKind::GuildText)],
            }],
            category_ids: vec![ChannelId::from("text")],
        }
    }

    #[test]
    fn test_expanded_category_lists_children() {
        let view = ViewState {
            expanded: vec![ChannelId::from("text")],
            selected: None,
        };

        assert_eq!(
            render_tree(&sample_tree(), &view),
            "@ dm (dm)\nv TEXT (1)\n    # general (general)\n"
        );
    }

    #[test]
    fn test_collapsed_category_shows_header_only() {
        let rendered = render_tree(&sample_tree(), &ViewState::default());
        assert_eq!(rendered, "@ dm (dm)\n> TEXT (1)\n");
    }

    #[test]
    fn test_messages_render_oldest_first() {
        let mut edited = message("2", 5, "second");
        edited.edited_timestamp = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 6, 0).unwrap());
        let messages = vec![edited, message("1", 0, "first")];

        assert_eq!(
            render_messages(&messages),
            "[2024-03-01 12:00] Alice: first\n[2024-03-01 12:05] Alice: second (edited)\n"
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(render_messages(&[]), "(no messages)\n");
        assert_eq!(
            render_tree(&ChannelTree::default(), &ViewState::default()),
            "(no channels)\n"
        );
    }

    #[test]
    fn test_groups_listed_with_ids() {
        let groups = vec![
            Guild {
                id: GroupId::new("g1"),
                name: "Rustaceans".into(),
                icon: None,
            },
            Guild {
                id: GroupId::new("g2"),
                name: "Gophers".into(),
                icon: Some("abc".into()),
            },
        ];

        assert_eq!(
            render_groups(&groups),
            "Groups:\n  Rustaceans (g1)\n  Gophers (g2)\n"
        );
        assert_eq!(render_groups(&[]), "Groups:\n  (none)\n");
    }
}
