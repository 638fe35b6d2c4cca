//! Front-office features that sit beside the case list: the public contact
//! form, the photo gallery, the admin name lists, and litigation records.
//!
//! | Module       | Purpose                                                  |
//! |--------------|----------------------------------------------------------|
//! | `models`     | Rows for employees, banks, contacts, gallery, litigation |
//! | `contact`    | Contact form submission and the submissions filter       |
//! | `gallery`    | Image upload, retitle, delete and bucket sync            |
//! | `catalog`    | Loan-type and application-type lists                     |
//! | `litigation` | Filtered litigation list and its status counts           |

pub mod catalog;
pub mod contact;
pub mod gallery;
pub mod litigation;
pub mod models;
