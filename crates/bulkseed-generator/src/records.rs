//! Record types and their table layouts.

use serde::Serialize;

/// A record that maps onto one row of a named table.
///
/// `COLUMNS` lists the column names in the order the record serializes its
/// fields; staging files and `COPY` statements both rely on that order.
pub trait TableRecord: Serialize {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
}

/// A person from the shared reference pool (`name_basics`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub nconst: String,
    pub primary_name: String,
    pub birth_year: i32,
    pub death_year: Option<i32>,
    pub primary_profession: String,
    pub known_for_titles: String,
}

impl TableRecord for Person {
    const TABLE: &'static str = "name_basics";
    const COLUMNS: &'static [&'static str] = &[
        "nconst",
        "primaryname",
        "birthyear",
        "deathyear",
        "primaryprofession",
        "knownfortitles",
    ];
}

/// A title generated inside one batch (`title_basics`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    pub tconst: String,
    pub title_type: &'static str,
    pub primary_title: String,
    pub original_title: String,
    pub is_adult: bool,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub runtime_minutes: i32,
    pub genres: String,
}

impl TableRecord for Title {
    const TABLE: &'static str = "title_basics";
    const COLUMNS: &'static [&'static str] = &[
        "tconst",
        "titletype",
        "primarytitle",
        "originaltitle",
        "isadult",
        "startyear",
        "endyear",
        "runtimeminutes",
        "genres",
    ];
}

/// Links one title to one person (`title_principals`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub tconst: String,
    /// 1-based position of this principal within its title.
    pub ordering: u32,
    pub nconst: String,
    pub category: Category,
    pub job: Option<String>,
    pub characters: Option<String>,
}

impl TableRecord for Principal {
    const TABLE: &'static str = "title_principals";
    const COLUMNS: &'static [&'static str] =
        &["tconst", "ordering", "nconst", "category", "job", "characters"];
}

/// Role a person plays in a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Actor,
    Actress,
    ArchiveFootage,
    ArchiveSound,
    Cinematographer,
    Composer,
    Director,
    Editor,
    Producer,
    ProductionDesigner,
    #[serde(rename = "self")]
    Itself,
    Writer,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Actor,
        Category::Actress,
        Category::ArchiveFootage,
        Category::ArchiveSound,
        Category::Cinematographer,
        Category::Composer,
        Category::Director,
        Category::Editor,
        Category::Producer,
        Category::ProductionDesigner,
        Category::Itself,
        Category::Writer,
    ];

    /// Performers carry a character name; everyone else carries a job.
    pub fn is_performer(self) -> bool {
        matches!(self, Category::Actor | Category::Actress | Category::Itself)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Actor => "actor",
            Category::Actress => "actress",
            Category::ArchiveFootage => "archive_footage",
            Category::ArchiveSound => "archive_sound",
            Category::Cinematographer => "cinematographer",
            Category::Composer => "composer",
            Category::Director => "director",
            Category::Editor => "editor",
            Category::Producer => "producer",
            Category::ProductionDesigner => "production_designer",
            Category::Itself => "self",
            Category::Writer => "writer",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
