//! Prompt templates and fixed reply lines.

use crate::utils::error::ApiError;

/// Topic shown to the model before any search has happened
pub const NO_TOPIC: &str = "なし";

/// Keyword-decision prompt: answer chit-chat directly, or emit `【SEARCH:…】`.
pub fn classify_prompt(user_input: &str, previous_topic: &str) -> String {
    format!(
        r#"
ユーザー入力: "{user_input}"
直前の文脈: "{previous_topic}"

楽天市場で商品を検索するための最適なキーワードを1つだけ教えて。
雑談なら回答のみ、検索が必要なら【SEARCH:キーワード】の形式で出力して。
"#
    )
}

/// Per-item blurb prompt. `caption` is expected to be truncated already.
pub fn comment_prompt(name: &str, price: u64, caption: &str) -> String {
    format!(
        r#"
商品名: {name}
価格: {price}円
キャッチコピー: {caption}

この商品の魅力を伝える、100文字以内の「おすすめコメント」を書いて。
"#
    )
}

/// Header line for a non-empty result. The count stays at three whatever the
/// number of items returned.
pub fn found_reply(keyword: &str) -> String {
    format!("「{}」のおすすめ商品を3つ厳選しました！", keyword)
}

pub fn not_found_reply(keyword: &str) -> String {
    format!("「{}」は見つかりませんでした💦", keyword)
}

/// Inline text shown in place of model output when a model call fails.
pub fn error_reply(err: &ApiError) -> String {
    format!("エラー: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prompt_embeds_input_and_topic() {
        let prompt = classify_prompt("もっと安いのある？", "電気シェーバー");
        assert!(prompt.contains(r#"ユーザー入力: "もっと安いのある？""#));
        assert!(prompt.contains(r#"直前の文脈: "電気シェーバー""#));
        assert!(prompt.contains("【SEARCH:キーワード】"));
    }

    #[test]
    fn test_comment_prompt_fields() {
        let prompt = comment_prompt("シェーバーX", 12800, "深剃り");
        assert!(prompt.contains("商品名: シェーバーX"));
        assert!(prompt.contains("価格: 12800円"));
        assert!(prompt.contains("キャッチコピー: 深剃り"));
    }

    #[test]
    fn test_fixed_replies() {
        assert_eq!(
            found_reply("電気シェーバー"),
            "「電気シェーバー」のおすすめ商品を3つ厳選しました！"
        );
        assert_eq!(
            not_found_reply("zzzznoresults"),
            "「zzzznoresults」は見つかりませんでした💦"
        );
    }

    #[test]
    fn test_error_reply_prefix() {
        let reply = error_reply(&ApiError::LlmError("timeout".to_string()));
        assert!(reply.starts_with("エラー: "));
        assert!(reply.contains("timeout"));
    }
}
