mod applicability;
mod constructors;
mod inference;
