use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::lenient::{opt_string, DocId};
use super::{Role, ValidationError};

/// Portfolios are organized in twelve teaching weeks.
pub const WEEK_COUNT: u8 = 12;

/// File type sent when the upload has no recognizable extension.
const DEFAULT_FILE_TYPE: &str = "pdf";

/// Section of a week a file is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Teoría")]
    Theory,
    #[serde(rename = "Práctica")]
    Practice,
    #[serde(rename = "Laboratorio")]
    Laboratory,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Theory, Category::Practice, Category::Laboratory];

    /// Value stored by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Theory => "Teoría",
            Category::Practice => "Práctica",
            Category::Laboratory => "Laboratorio",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Theory => "Theory",
            Category::Practice => "Practice",
            Category::Laboratory => "Laboratory",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Category::Theory => Category::Practice,
            Category::Practice => Category::Laboratory,
            Category::Laboratory => Category::Theory,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Category::Theory => Category::Laboratory,
            Category::Practice => Category::Theory,
            Category::Laboratory => Category::Practice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortfolioFile {
    #[serde(flatten)]
    pub key: DocId,
    #[serde(default, deserialize_with = "opt_string")]
    pub semana: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    /// Email of the uploader.
    #[serde(default)]
    pub usuario: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default, rename = "nombreOriginal")]
    pub nombre_original: Option<String>,
    #[serde(default, rename = "originalName")]
    pub original_name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub enlace: Option<String>,
}

impl PortfolioFile {
    pub fn id(&self) -> &str {
        self.key.as_str()
    }

    pub fn week(&self) -> Option<u8> {
        self.semana.as_deref().and_then(|w| w.trim().parse().ok())
    }

    pub fn category(&self) -> Option<Category> {
        let raw = self.categoria.as_deref()?;
        Category::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    pub fn display_name(&self) -> &str {
        self.nombre_original
            .as_deref()
            .or(self.original_name.as_deref())
            .or(self.filename.as_deref())
            .unwrap_or("Archivo")
    }

    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().or(self.enlace.as_deref())
    }

    pub fn is_uploaded_by(&self, email: &str) -> bool {
        self.usuario.as_deref() == Some(email)
    }

    /// Administrators may delete any file; everyone else only their own.
    pub fn can_delete(&self, role: Option<Role>, email: Option<&str>) -> bool {
        role == Some(Role::Administrator) || email.is_some_and(|e| self.is_uploaded_by(e))
    }
}

/// Files the user may see: all for administrators, only their own uploads
/// for teachers.
pub fn visible_files(
    files: Vec<PortfolioFile>,
    role: Option<Role>,
    email: Option<&str>,
) -> Vec<PortfolioFile> {
    match role {
        Some(Role::Administrator) => files,
        _ => files
            .into_iter()
            .filter(|f| email.is_some_and(|e| f.is_uploaded_by(e)))
            .collect(),
    }
}

/// Files filed under one week and category, in arrival order.
pub fn files_in(files: &[PortfolioFile], week: u8, category: Category) -> Vec<&PortfolioFile> {
    files
        .iter()
        .filter(|f| f.week() == Some(week) && f.category() == Some(category))
        .collect()
}

/// Number of files per week, index 0 being week 1.
pub fn week_counts(files: &[PortfolioFile]) -> [usize; WEEK_COUNT as usize] {
    let mut counts = [0; WEEK_COUNT as usize];
    for week in files.iter().filter_map(PortfolioFile::week) {
        if (1..=WEEK_COUNT).contains(&week) {
            counts[(week - 1) as usize] += 1;
        }
    }
    counts
}

/// One multipart upload of local files into a portfolio section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub portfolio_id: String,
    pub week: u8,
    pub category: Category,
    pub paths: Vec<PathBuf>,
}

impl UploadRequest {
    /// Split a user-entered list (`;` or `,` separated) into paths.
    pub fn parse_paths(input: &str) -> Vec<PathBuf> {
        input
            .split([';', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.paths.is_empty() {
            return Err(ValidationError::NoFiles);
        }
        if !(1..=WEEK_COUNT).contains(&self.week) {
            return Err(ValidationError::WeekOutOfRange(WEEK_COUNT));
        }
        Ok(())
    }

    /// Display name sent along with the files.
    pub fn label(&self) -> String {
        self.paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Lower-case extension of the first file, `pdf` when there is none.
    pub fn file_type(&self) -> String {
        self.paths
            .first()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PortfolioFile> {
        serde_json::from_str(
            r#"[
                {"_id": "f1", "semana": 1, "categoria": "Teoría", "usuario": "ana@uni.edu", "nombreOriginal": "silabo.pdf", "url": "https://cdn/f1"},
                {"_id": "f2", "semana": "1", "categoria": "Práctica", "usuario": "luis@uni.edu", "originalName": "pc1.pdf"},
                {"_id": "f3", "semana": 3, "categoria": "Laboratorio", "usuario": "ana@uni.edu", "filename": "lab3.zip", "enlace": "https://cdn/f3"},
                {"_id": "f4", "id": "f4", "semana": 1, "categoria": "Teoría", "usuario": "ana@uni.edu"},
                {"_id": "f5", "semana": 14, "categoria": "Otro"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_week_accepts_numbers_and_strings() {
        let files = sample();
        assert_eq!(files[0].week(), Some(1));
        assert_eq!(files[1].week(), Some(1));
        assert_eq!(files[4].category(), None);
    }

    #[test]
    fn test_record_with_both_id_keys() {
        let file: PortfolioFile =
            serde_json::from_str(r#"{"_id": "f9", "id": "f9", "semana": 2, "categoria": "Teoría"}"#).unwrap();
        assert_eq!(file.id(), "f9");
        assert_eq!(file.week(), Some(2));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let files = sample();
        assert_eq!(files[0].display_name(), "silabo.pdf");
        assert_eq!(files[1].display_name(), "pc1.pdf");
        assert_eq!(files[2].display_name(), "lab3.zip");
        assert_eq!(files[3].display_name(), "Archivo");
        assert_eq!(files[2].link(), Some("https://cdn/f3"));
        assert_eq!(files[3].link(), None);
    }

    #[test]
    fn test_teacher_sees_own_files_only() {
        let visible = visible_files(sample(), Some(Role::Teacher), Some("ana@uni.edu"));
        let ids: Vec<&str> = visible.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["f1", "f3", "f4"]);

        assert_eq!(visible_files(sample(), Some(Role::Administrator), None).len(), 5);
        assert!(visible_files(sample(), Some(Role::Teacher), None).is_empty());
    }

    #[test]
    fn test_files_grouped_by_week_and_category() {
        let files = sample();
        let theory: Vec<&str> = files_in(&files, 1, Category::Theory)
            .iter()
            .map(|f| f.id())
            .collect();
        assert_eq!(theory, vec!["f1", "f4"]);
        assert_eq!(files_in(&files, 1, Category::Practice).len(), 1);
        assert!(files_in(&files, 2, Category::Theory).is_empty());

        let counts = week_counts(&files);
        assert_eq!(counts[0], 3);
        assert_eq!(counts[2], 1);
        assert_eq!(counts.iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_delete_permission() {
        let files = sample();
        assert!(files[0].can_delete(Some(Role::Administrator), None));
        assert!(files[0].can_delete(Some(Role::Teacher), Some("ana@uni.edu")));
        assert!(!files[1].can_delete(Some(Role::Teacher), Some("ana@uni.edu")));
    }

    #[test]
    fn test_category_cycle() {
        assert_eq!(Category::Theory.next(), Category::Practice);
        assert_eq!(Category::Laboratory.next(), Category::Theory);
        assert_eq!(Category::Theory.prev(), Category::Laboratory);
        assert_eq!(serde_json::to_value(Category::Practice).unwrap(), "Práctica");
    }

    #[test]
    fn test_upload_request_paths_and_type() {
        let paths = UploadRequest::parse_paths(" notes/sem1.PDF ; slides.pptx,, ");
        assert_eq!(paths, vec![PathBuf::from("notes/sem1.PDF"), PathBuf::from("slides.pptx")]);

        let request = UploadRequest {
            portfolio_id: "p1".to_string(),
            week: 1,
            category: Category::Theory,
            paths,
        };
        assert_eq!(request.validate(), Ok(()));
        assert_eq!(request.file_type(), "pdf");
        assert_eq!(request.label(), "sem1.PDF, slides.pptx");
    }

    #[test]
    fn test_upload_request_validation() {
        let mut request = UploadRequest {
            portfolio_id: "p1".to_string(),
            week: 0,
            category: Category::Theory,
            paths: vec![],
        };
        assert_eq!(request.validate(), Err(ValidationError::NoFiles));

        request.paths.push(PathBuf::from("a.txt"));
        assert_eq!(request.validate(), Err(ValidationError::WeekOutOfRange(WEEK_COUNT)));

        request.week = 12;
        assert_eq!(request.validate(), Ok(()));
        assert_eq!(request.file_type(), "txt");
    }
}
