pub mod company;
pub mod department;
pub mod employee;
pub mod job_title;
pub mod leave;
pub mod response;
pub mod user;

#[cfg(test)]
pub mod test_support;
