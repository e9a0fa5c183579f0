pub mod ask_local;
pub mod file_qa_prompt;
pub mod read_file;
