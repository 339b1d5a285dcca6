//! Operator confirmation of parsed metadata
//!
//! Before a tagged file is ingested the pipeline shows the parsed title and
//! artist to a [`MetadataConfirmer`]. An answer containing `y` (any case)
//! accepts; anything else, including an empty line, asks for a corrected
//! name and a `|`-separated artist list.

use async_trait::async_trait;
use kvt_common::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// What the pipeline parsed from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataProposal {
    pub file_name: String,
    pub title: String,
    pub artist: String,
}

/// Operator decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Accept,
    Correct { name: String, artists: Vec<String> },
}

#[async_trait]
pub trait MetadataConfirmer: Send + Sync {
    async fn confirm(&self, proposal: &MetadataProposal) -> Result<Confirmation>;
}

/// Headless confirmer that accepts every proposal
#[derive(Debug, Clone, Default)]
pub struct AutoConfirm;

#[async_trait]
impl MetadataConfirmer for AutoConfirm {
    async fn confirm(&self, _proposal: &MetadataProposal) -> Result<Confirmation> {
        Ok(Confirmation::Accept)
    }
}

/// Interactive confirmer over a line-based reader and writer
pub struct ConsoleConfirm<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsoleConfirm<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Confirmer bound to the process console
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleConfirm<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

async fn prompt<R, W>(reader: &mut R, writer: &mut W, text: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(Error::Cancelled("confirmation input closed".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[async_trait]
impl<R, W> MetadataConfirmer for ConsoleConfirm<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, proposal: &MetadataProposal) -> Result<Confirmation> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let summary = format!(
            "Parsed tags from {}\n    Name: {}\n    Artist: {}\nIs this okay? [Y/n] ",
            proposal.file_name, proposal.title, proposal.artist
        );
        let answer = prompt(reader, writer, &summary).await?;
        if is_affirmative(&answer) {
            return Ok(Confirmation::Accept);
        }

        let name = prompt(reader, writer, "Name: ").await?;
        let artists = prompt(reader, writer, "Artists (separated by '|'): ").await?;

        Ok(Confirmation::Correct {
            name: name.trim().to_string(),
            artists: parse_artist_list(&artists),
        })
    }
}

/// True when the answer contains a `y` in any case
pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase().contains('y')
}

/// Split a `|`-delimited artist list, trimming entries and dropping blanks
pub fn parse_artist_list(input: &str) -> Vec<String> {
    input
        .split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> MetadataProposal {
        MetadataProposal {
            file_name: "imagine.mp3".to_string(),
            title: "Imagine".to_string(),
            artist: "John Lennon".to_string(),
        }
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("Yes"));
        assert!(is_affirmative("okay"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("no"));
    }

    #[test]
    fn test_parse_artist_list() {
        assert_eq!(
            parse_artist_list(" Queen | David Bowie ||"),
            vec!["Queen".to_string(), "David Bowie".to_string()]
        );
        assert!(parse_artist_list("").is_empty());
    }

    #[tokio::test]
    async fn test_auto_confirm_accepts() {
        assert_eq!(
            AutoConfirm.confirm(&proposal()).await.unwrap(),
            Confirmation::Accept
        );
    }

    #[tokio::test]
    async fn test_console_accepts_yes() {
        let confirmer = ConsoleConfirm::new(&b"Y\n"[..], Vec::new());
        assert_eq!(
            confirmer.confirm(&proposal()).await.unwrap(),
            Confirmation::Accept
        );

        let guard = confirmer.io.lock().await;
        let shown = String::from_utf8_lossy(&guard.1);
        assert!(shown.contains("Name: Imagine"));
        assert!(shown.contains("Artist: John Lennon"));
    }

    #[tokio::test]
    async fn test_console_empty_answer_asks_for_correction() {
        let input = b"\nImagine (Remastered)\nJohn Lennon|Yoko Ono\n";
        let confirmer = ConsoleConfirm::new(&input[..], Vec::new());
        assert_eq!(
            confirmer.confirm(&proposal()).await.unwrap(),
            Confirmation::Correct {
                name: "Imagine (Remastered)".to_string(),
                artists: vec!["John Lennon".to_string(), "Yoko Ono".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_console_closed_input_is_cancelled() {
        let confirmer = ConsoleConfirm::new(&b""[..], Vec::new());
        let err = confirmer.confirm(&proposal()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }
}
