//! Script text post-processing
//!
//! Turns raw model output into a list of short broadcast lines.

/// Sentence terminators used when line splitting yields too few scripts
const SENTENCE_TERMINATORS: [char; 4] = ['。', '！', '？', '\n'];

/// Sentence fragments this short (in characters) are dropped
const MIN_FRAGMENT_CHARS: usize = 5;

/// Generic line used when generation fails outright
pub fn fallback_line(topic: &str) -> String {
    format!("欢迎了解{}，这里有最优质的产品和服务！", topic)
}

/// `count` copies of the fallback line (at least one)
pub fn fallback_scripts(topic: &str, count: usize) -> Vec<String> {
    vec![fallback_line(topic); count.max(1)]
}

/// Prompt asking for `count` short marketing lines about `topic`
pub fn build_prompt(topic: &str, count: usize) -> String {
    format!(
        "请生成 {} 条关于\"{}\"的简短、吸引人的营销文案。要求：\n\
         1. 每条文案不超过30个字\n\
         2. 语言生动有趣，有感染力\n\
         3. 适合直播场景播报\n\
         4. 直接输出文案，每行一条，不要编号\n\n\
         请开始生成：",
        count, topic
    )
}

/// Split model output into at most `count` lines
///
/// Lines that look like list items (`1.`, `-`, `*`) are dropped. If that
/// leaves fewer than `count`, the text is re-split on sentence terminators
/// and short fragments are discarded. An empty result falls back to a
/// single generic line.
pub fn parse_scripts(output: &str, topic: &str, count: usize) -> Vec<String> {
    let output = output.trim();

    let mut scripts: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_list_marker(line))
        .map(str::to_string)
        .collect();

    if scripts.len() < count {
        scripts = output
            .split(|c| SENTENCE_TERMINATORS.contains(&c))
            .map(str::trim)
            .filter(|s| s.chars().count() > MIN_FRAGMENT_CHARS)
            .map(str::to_string)
            .collect();
    }

    if scripts.is_empty() {
        scripts.push(fallback_line(topic));
    }

    scripts.truncate(count);
    scripts
}

fn is_list_marker(line: &str) -> bool {
    if line.starts_with('-') || line.starts_with('*') {
        return true;
    }
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('1'..='9'), Some('.'))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines() {
        let output = "咖啡机让每个早晨都充满香气\n一键萃取，专业口感在家享\n小巧机身，大大的幸福感\n";
        let scripts = parse_scripts(output, "咖啡机", 3);
        assert_eq!(
            scripts,
            ["咖啡机让每个早晨都充满香气", "一键萃取，专业口感在家享", "小巧机身，大大的幸福感"]
        );
    }

    #[test]
    fn test_truncates_to_count() {
        let output = "第一条营销文案内容\n第二条营销文案内容\n第三条营销文案内容";
        assert_eq!(parse_scripts(output, "t", 2).len(), 2);
    }

    #[test]
    fn test_numbered_lines_fall_back_to_sentence_split() {
        // Every line is numbered, so line splitting yields nothing and the
        // sentence split keeps the long fragments.
        let output = "1. 香浓咖啡每天都有好心情！\n2. 精致生活从一杯咖啡开始。";
        let scripts = parse_scripts(output, "咖啡", 2);
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains("香浓咖啡每天都有好心情"));
        assert!(scripts[1].contains("精致生活从一杯咖啡开始"));
    }

    #[test]
    fn test_short_fragments_dropped() {
        let output = "好！\n棒！";
        assert_eq!(parse_scripts(output, "咖啡机", 5), [fallback_line("咖啡机")]);
    }

    #[test]
    fn test_empty_output_falls_back() {
        assert_eq!(parse_scripts("   ", "咖啡机", 5), [fallback_line("咖啡机")]);
    }

    #[test]
    fn test_fallback_scripts_never_empty() {
        assert_eq!(fallback_scripts("x", 3).len(), 3);
        assert_eq!(fallback_scripts("x", 0).len(), 1);
        assert!(fallback_scripts("咖啡机", 1)[0].contains("咖啡机"));
    }

    #[test]
    fn test_prompt_mentions_topic_and_count() {
        let prompt = build_prompt("咖啡机", 5);
        assert!(prompt.contains("5 条"));
        assert!(prompt.contains("\"咖啡机\""));
    }
}
