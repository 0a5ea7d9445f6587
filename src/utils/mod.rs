pub mod jwt;
pub mod multipart;
pub mod password;
pub mod phone;
pub mod qr;
pub mod storage;
pub mod url;
pub mod validation;

pub use jwt::*;
pub use multipart::{FormData, UploadedFile, read_form};
pub use password::*;
pub use phone::*;
pub use qr::{render_qr_svg, write_umkm_qr};
pub use storage::*;
pub use url::*;
pub use validation::*;
