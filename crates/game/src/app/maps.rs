use std::fs;
use std::path::{Path, PathBuf};

use echo_engine::{Board, BoardError};
use thiserror::Error;

/// Built-in map used when no map file is configured.
pub(crate) const DEMO_MAP: &str = "\
##########################
#@.......#...............#
#........#......o........#
#..####..#..........###..#
#..#.....hhhhhhhh...#....#
#..#..o..#......h...#....#
#........#......h........#
####.#####......h..#######
#...............h........#
#..o.....####...h........#
#........#......hhhhhhh..#
#..####..#.....o.........#
#........#...........o...#
#.....o..........#.......#
#..........#######.....E.#
##########################";

#[derive(Debug, Error)]
pub(crate) enum MapError {
    #[error("failed to read map {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid map {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: BoardError,
    },
}

pub(crate) fn load_board(path: Option<&Path>) -> Result<Board, MapError> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| MapError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_board(&path.display().to_string(), &text)
        }
        None => parse_board("demo", DEMO_MAP),
    }
}

fn parse_board(name: &str, text: &str) -> Result<Board, MapError> {
    Board::from_ascii(text).map_err(|source| MapError::Parse {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use echo_engine::{CellCoord, CellKind};

    use super::*;

    #[test]
    fn demo_map_parses_with_spawn_and_exit() {
        let board = load_board(None).expect("demo map");

        assert_eq!(board.width(), 26);
        assert_eq!(board.height(), 16);
        assert_eq!(board.avatar_spawn(), CellCoord::new(1, 1));
        assert!(board
            .iter()
            .any(|(_, cell)| cell.kind == CellKind::Exit));
    }

    #[test]
    fn map_file_is_loaded_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "#####\n#@.E#\n#####\n").expect("write map");

        let board = load_board(Some(file.path())).expect("board");

        assert_eq!(board.width(), 5);
        assert_eq!(board.kind_at(CellCoord::new(1, 3)), Some(CellKind::Exit));
    }

    #[test]
    fn ragged_map_file_names_the_source() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "#####\n#@.#\n#####\n").expect("write map");

        let err = load_board(Some(file.path())).expect_err("ragged");

        assert!(matches!(err, MapError::Parse { .. }));
        assert!(err.to_string().contains("invalid map"));
    }

    #[test]
    fn missing_map_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_board(Some(&dir.path().join("absent.txt"))).expect_err("missing");

        assert!(matches!(err, MapError::Read { .. }));
    }
}
