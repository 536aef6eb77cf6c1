use async_trait::async_trait;
use eyre::{Result, WrapErr, bail, eyre};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::{Segment, Transcript};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const CLIENT_VERSION: &str = "2.20241126.01.00";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    captions: Option<Captions>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
}

impl PlayerResponse {
    fn title(&self) -> String {
        self.video_details
            .as_ref()
            .and_then(|vd| vd.title.clone())
            .unwrap_or_default()
    }

    fn into_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default()
    }
}

/// Source of caption transcripts for a video identifier
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<Transcript>;
}

/// Fetches captions straight from YouTube, preferring one language
#[derive(Debug, Clone)]
pub struct CaptionFetcher {
    client: reqwest::Client,
    lang: String,
}

impl CaptionFetcher {
    pub fn new(client: reqwest::Client, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for CaptionFetcher {
    async fn fetch(&self, video_id: &str) -> Result<Transcript> {
        info!("Fetching captions for {video_id} (lang={})", self.lang);
        fetch_captions(&self.client, video_id, &self.lang)
            .await
            .wrap_err_with(|| format!("caption fetch failed for video {video_id}"))
    }
}

/// Fetch transcript from YouTube's built-in captions via the InnerTube API
pub async fn fetch_captions(client: &reqwest::Client, video_id: &str, lang: &str) -> Result<Transcript> {
    if video_id.trim().is_empty() {
        bail!("empty video id");
    }

    let page_html = get_text(watch_page_request(client, video_id)).await?;
    let api_key = extract_api_key(&page_html)?;
    debug!("Extracted InnerTube API key: {api_key}");

    let player = fetch_player(client, &api_key, video_id, lang).await?;
    let title = player.title();
    let tracks = player.into_tracks();

    let track = select_track(&tracks, lang).ok_or_else(|| eyre!("no captions available for video {video_id}"))?;
    debug!("Using caption track: lang={}", track.language_code);

    let caption_xml = get_text(client.get(track.base_url.as_str())).await?;
    let segments = parse_caption_xml(&caption_xml)?;
    debug!("Parsed {} caption segments for {video_id}", segments.len());

    Ok(Transcript {
        video_id: video_id.to_string(),
        title,
        language: track.language_code.clone(),
        segments,
    })
}

/// The id is sent as an encoded query value, never spliced into the URL
fn watch_page_request(client: &reqwest::Client, video_id: &str) -> reqwest::RequestBuilder {
    client.get(WATCH_URL).query(&[("v", video_id)])
}

async fn get_text(request: reqwest::RequestBuilder) -> Result<String> {
    let text = request
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

async fn fetch_player(client: &reqwest::Client, api_key: &str, video_id: &str, lang: &str) -> Result<PlayerResponse> {
    let body = serde_json::json!({
        "context": {
            "client": {
                "hl": lang,
                "gl": "US",
                "clientName": "WEB",
                "clientVersion": CLIENT_VERSION
            }
        },
        "videoId": video_id
    });

    let player = client
        .post(format!("{PLAYER_URL}?key={api_key}&prettyPrint=false"))
        .header("User-Agent", USER_AGENT)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(player)
}

/// Requested language if present, otherwise the first track
fn select_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == lang)
        .or_else(|| tracks.first())
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::{BytesStart, Event};

    fn timing(e: &BytesStart<'_>) -> (Option<f64>, Option<f64>) {
        let mut start = None;
        let mut dur = None;
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
            match attr.key.as_ref() {
                b"start" => start = value,
                b"dur" => dur = value,
                _ => {}
            }
        }
        (start, dur)
    }

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut pending: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                pending = match timing(e) {
                    (Some(start), Some(dur)) => Some((start, dur)),
                    _ => None,
                };
            }
            Ok(Event::Text(ref e)) => {
                if let Some((start, duration)) = pending.take() {
                    let raw_text = e.unescape().unwrap_or_default();
                    // captions are double-escaped, and may wrap across lines
                    let text = html_escape::decode_html_entities(&raw_text).replace('\n', " ");
                    let text = text.trim();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text: text.to_string(),
                            start,
                            duration,
                        });
                    }
                }
            }
            Ok(Event::End(_)) => pending = None,
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}
