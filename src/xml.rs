//! Minimal XML extraction for AWS responses (no extra deps).
//!
//! The S3 and SQS APIs return small, flat XML documents; simple string
//! scanning is enough to pull out the handful of values we need.

/// Extract the text content of an XML tag (simple, non-nested),
/// with the five predefined entities unescaped.
pub fn extract_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    if let Some(start) = xml.find(&open) {
        let value_start = start + open.len();
        if let Some(end) = xml[value_start..].find(&close) {
            return Some(unescape(&xml[value_start..value_start + end]));
        }
    }
    None
}

/// Replace the predefined XML entities. `&amp;` goes last so it cannot
/// manufacture new entities out of already-replaced text.
fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Extract the inner text of every occurrence of a block tag, in order.
pub fn extract_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut remaining = xml;
    while let Some(start) = remaining.find(&open) {
        let block_start = start + open.len();
        match remaining[block_start..].find(&close) {
            Some(end) => {
                blocks.push(&remaining[block_start..block_start + end]);
                remaining = &remaining[block_start + end + close.len()..];
            }
            None => break,
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_value() {
        let xml = "<Result><QueueUrl>https://sqs.example/q</QueueUrl></Result>";
        assert_eq!(
            extract_value(xml, "QueueUrl").as_deref(),
            Some("https://sqs.example/q")
        );
        assert_eq!(extract_value(xml, "Missing"), None);
    }

    #[test]
    fn extracts_repeated_blocks_in_order() {
        let xml = "<L><Contents><Key>a</Key></Contents><Contents><Key>b</Key></Contents></L>";
        let blocks = extract_blocks(xml, "Contents");
        assert_eq!(blocks.len(), 2);
        assert_eq!(extract_value(blocks[0], "Key").as_deref(), Some("a"));
        assert_eq!(extract_value(blocks[1], "Key").as_deref(), Some("b"));
    }

    #[test]
    fn entity_escaped_keys_round_trip() {
        let xml = "<Contents><Key>output/a&amp;b &lt;x&gt;.zip</Key></Contents>";
        assert_eq!(
            extract_value(xml, "Key").as_deref(),
            Some("output/a&b <x>.zip")
        );
        // Plain values pass through untouched.
        assert_eq!(
            extract_value("<Key>output/html/a.zip</Key>", "Key").as_deref(),
            Some("output/html/a.zip")
        );
    }

    #[test]
    fn unterminated_block_stops_cleanly() {
        let xml = "<L><Contents><Key>a</Key></Contents><Contents><Key>b";
        assert_eq!(extract_blocks(xml, "Contents").len(), 1);
    }
}
